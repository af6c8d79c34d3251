//! Cover image transcoding: decode whatever the scraper downloaded, flatten
//! transparency onto white, and store a JPEG named after the novel id.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

/// JPEG quality for stored covers.
pub const COVER_QUALITY: u8 = 85;

/// Public path prefix under which stored covers are served.
pub const COVER_PUBLIC_PREFIX: &str = "/static/novels";

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("cover image not found: {0}")]
    Missing(PathBuf),

    #[error("could not decode or encode cover image: {0}")]
    Image(#[from] image::ImageError),

    #[error("could not write cover image: {0}")]
    Io(#[from] std::io::Error),
}

/// Transcode the cover at `source` into `{upload_dir}/{novel_id}.jpg` and
/// return the public path stored on the novel record.
pub fn process_cover(
    source: &Path,
    upload_dir: &Path,
    novel_id: i64,
) -> Result<String, CoverError> {
    if !source.is_file() {
        return Err(CoverError::Missing(source.to_path_buf()));
    }
    let decoded = image::open(source)?;
    let flattened = flatten_onto_white(&decoded);

    fs::create_dir_all(upload_dir)?;
    let filename = format!("{}.jpg", novel_id);
    let target = upload_dir.join(&filename);
    let file = fs::File::create(&target)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, COVER_QUALITY);
    flattened.write_with_encoder(encoder)?;
    writer.flush()?;

    Ok(format!("{}/{}", COVER_PUBLIC_PREFIX, filename))
}

/// Normalize to 3-channel RGB, compositing any transparency onto a white
/// background (JPEG has no alpha).
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn flatten_composites_transparency_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([200, 10, 10, 255]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([200, 10, 10]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn process_cover_writes_jpeg_named_after_novel() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cover.png");
        let mut rgba = RgbaImage::new(4, 6);
        for px in rgba.pixels_mut() {
            *px = Rgba([30, 60, 90, 255]);
        }
        rgba.save(&source).unwrap();

        let upload_dir = dir.path().join("static");
        let public = process_cover(&source, &upload_dir, 7).unwrap();
        assert_eq!(public, "/static/novels/7.jpg");

        let stored = image::open(upload_dir.join("7.jpg")).unwrap().to_rgb8();
        assert_eq!(stored.dimensions(), (4, 6));
    }

    #[test]
    fn process_cover_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = process_cover(&dir.path().join("no-existe.png"), dir.path(), 1).unwrap_err();
        assert!(matches!(err, CoverError::Missing(_)));
    }

    #[test]
    fn process_cover_rejects_non_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("roto.png");
        std::fs::write(&source, b"esto no es una imagen").unwrap();
        let err = process_cover(&source, dir.path(), 1).unwrap_err();
        assert!(matches!(err, CoverError::Image(_)));
    }
}
