//! End-to-end: a submission JSON written the way the scraper writes it,
//! verified, then imported into a file-backed catalog with a real cover.

use std::fs;

use nlscrape::catalog::{Catalog, ImportError, Importer};
use nlscrape::model::{NovelStatus, NovelSubmission, ScrapedChapter};
use nlscrape::verify;

fn chapter(n: u32) -> ScrapedChapter {
    ScrapedChapter {
        title: format!("Capítulo {}", n),
        content: format!("{} {}", "contenido narrativo suficientemente largo.".repeat(20), n),
        order_number: n,
        source_url: Some(format!("https://novelasligera.com/prueba-capitulo-{}/", n)),
    }
}

fn submission(image_path: Option<String>) -> NovelSubmission {
    NovelSubmission {
        name: "Novela de Prueba".to_string(),
        author: "Autor de Prueba".to_string(),
        description: "Una sinopsis con longitud suficiente para pasar la verificación sin avisos."
            .to_string(),
        rating: Some(8.4),
        status: NovelStatus::Ongoing,
        source_url: "https://novelasligera.com/novela/prueba/".to_string(),
        image_path,
        alternative_names: vec!["Test Novel".to_string()],
        genres: vec!["Drama".to_string(), "drama".to_string()],
        chapters: vec![chapter(1), chapter(2), chapter(3)],
    }
}

#[test]
fn submission_file_verifies_and_imports() {
    let dir = tempfile::tempdir().unwrap();

    // Cover the scraper would have downloaded next to the JSON.
    let cover_path = dir.path().join("prueba.png");
    let mut rgba = image::RgbaImage::new(5, 8);
    for px in rgba.pixels_mut() {
        *px = image::Rgba([120, 40, 200, 255]);
    }
    rgba.save(&cover_path).unwrap();

    let sub = submission(Some(cover_path.to_string_lossy().into_owned()));
    let json_path = dir.path().join("prueba.json");
    fs::write(&json_path, serde_json::to_string_pretty(&sub).unwrap()).unwrap();

    let report = verify::verify_file(&json_path).unwrap();
    assert!(report.is_valid(), "errors: {:?}", report.errors);

    let parsed: NovelSubmission = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    let catalog = Catalog::open(&dir.path().join("catalog.sqlite")).unwrap();
    let upload_dir = dir.path().join("static/novels");
    let importer = Importer::new(&catalog, &upload_dir);

    let response = importer.import(&parsed).unwrap();
    assert!(response.success);
    assert_eq!(response.stats.chapters_created, 3);
    assert_eq!(response.stats.chapters_updated, 0);
    assert_eq!(response.stats.alternative_names_created, 1);
    // "Drama" and "drama" normalize to one genre and one association.
    assert_eq!(response.stats.genres_created, 1);
    assert_eq!(response.stats.genres_associated, 1);
    assert!(response.stats.cover_uploaded);
    assert!(upload_dir.join(format!("{}.jpg", response.novel_id)).is_file());

    // Same name again: hard conflict, nothing merged.
    let err = importer.import(&parsed).unwrap_err();
    assert!(matches!(err, ImportError::Conflict { .. }));

    // Refreshing chapter content through the upsert path keeps the count.
    let mut revised = parsed.chapters.clone();
    revised[0].content = "contenido corregido tras una nueva pasada del scraper".to_string();
    let (created, updated) = importer.upsert_chapters(response.novel_id, &revised).unwrap();
    assert_eq!((created, updated), (0, 3));
    assert_eq!(catalog.chapter_count(response.novel_id).unwrap(), 3);
    assert_eq!(
        catalog.chapter_content(response.novel_id, 1).unwrap().as_deref(),
        Some("contenido corregido tras una nueva pasada del scraper")
    );
}

#[test]
fn import_without_cover_reports_flag_only() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::open(&dir.path().join("catalog.sqlite")).unwrap();
    let importer = Importer::new(&catalog, dir.path().join("static"));

    let sub = submission(Some(dir.path().join("desaparecida.png").to_string_lossy().into_owned()));
    let response = importer.import(&sub).unwrap();
    assert!(response.success);
    assert!(!response.stats.cover_uploaded);
    assert_eq!(catalog.novel_cover_path(response.novel_id).unwrap(), None);
}
