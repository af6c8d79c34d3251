//! Scrape pipeline: polite fetching, metadata extraction, chapter
//! discovery, content extraction, and the run orchestrator that ties them
//! together and serializes the result.

pub mod client;
pub mod content;
pub mod error;
pub mod metadata;
pub mod text;
pub mod toc;

pub use client::{PoliteClient, PoliteClientBuilder};
pub use error::ScraperError;

use std::fs;
use std::path::{Path, PathBuf};

use scraper::Html;

use crate::model::{NovelSubmission, ScrapedChapter};

/// Accepted chapters must clean up to at least this many characters; below
/// it the chapter is recorded as skipped, not silently discarded.
pub const MIN_CHAPTER_CHARS: usize = 500;

/// Options for one scrape run.
pub struct ScrapeOptions<'a> {
    /// First chapter ordinal to fetch (1-based, inclusive).
    pub start: u32,
    /// Last chapter ordinal to fetch (inclusive). `None` = all.
    pub end: Option<u32>,
    /// Directory receiving `{slug}.json` and the cover image.
    pub output_dir: &'a Path,
    /// Called with (done, total) before each chapter fetch.
    pub progress: Option<&'a dyn Fn(u32, u32)>,
}

/// One chapter that did not make it into the output, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedChapter {
    pub number: u32,
    pub reason: String,
}

/// Result of a scrape run: the submission written to disk plus statistics.
pub struct ScrapeOutcome {
    pub novel: NovelSubmission,
    pub json_path: PathBuf,
    pub downloaded: u32,
    pub skipped: Vec<SkippedChapter>,
}

/// Check response status and read the body as UTF-8.
fn check_response(
    response: reqwest::blocking::Response,
    url: &str,
    context: Option<&str>,
) -> Result<String, ScraperError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
            context: context.map(String::from),
        });
    }
    response.text().map_err(|e| ScraperError::BodyRead { source: e })
}

fn validate_slug(slug: &str) -> Result<(), ScraperError> {
    if slug.is_empty() {
        return Err(ScraperError::InvalidSlug {
            slug: slug.to_string(),
            reason: "slug is empty".to_string(),
        });
    }
    if slug.contains('/') || slug.contains(char::is_whitespace) {
        return Err(ScraperError::InvalidSlug {
            slug: slug.to_string(),
            reason: "slug must be the final URL path segment, without slashes or spaces"
                .to_string(),
        });
    }
    Ok(())
}

/// File extension for a downloaded cover, taken from the URL path with a
/// `.jpg` fallback.
fn cover_extension(image_url: &str) -> String {
    let path = image_url.split(['?', '#']).next().unwrap_or(image_url);
    let ext = path.rsplit('/').next().and_then(|name| name.rsplit_once('.')).map(|(_, e)| e);
    match ext {
        Some(e)
            if !e.is_empty()
                && e.len() <= 5
                && e.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            e.to_ascii_lowercase()
        }
        _ => "jpg".to_string(),
    }
}

/// Download the cover next to the JSON output. Best-effort: any failure is
/// reported and yields `None`.
fn download_cover(
    client: &mut PoliteClient,
    image_url: &str,
    output_dir: &Path,
    slug: &str,
) -> Option<String> {
    let response = match client.get_with_retry(image_url) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Cover: network error at {}: {}. Skipped.", image_url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        eprintln!("Cover: HTTP {} at {}. Skipped.", response.status().as_u16(), image_url);
        return None;
    }
    let bytes = match response.bytes() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Cover: failed to read body: {}. Skipped.", e);
            return None;
        }
    };
    let path = output_dir.join(format!("{}.{}", slug, cover_extension(image_url)));
    match fs::write(&path, &bytes) {
        Ok(()) => Some(path.to_string_lossy().into_owned()),
        Err(e) => {
            eprintln!("Cover: could not write {}: {}. Skipped.", path.display(), e);
            None
        }
    }
}

/// Scrape one novel: index page, metadata, chapter discovery, then each
/// chapter in the requested ordinal range.
///
/// Failures on individual chapters (network, HTTP status, unreadable body,
/// missing or too-short content) are recorded in `skipped` and never abort
/// the run. The cover, when resolved, is downloaded next to the JSON; the
/// serialized submission lands at `{output_dir}/{slug}.json`.
pub fn scrape_novel(
    client: &mut PoliteClient,
    base_url: &str,
    slug: &str,
    options: &ScrapeOptions<'_>,
) -> Result<ScrapeOutcome, ScraperError> {
    validate_slug(slug)?;
    let index_url = format!("{}/novela/{}/", base_url, slug);

    let response = client.get_with_retry(&index_url).map_err(|e| ScraperError::Network {
        url: index_url.clone(),
        source: e,
    })?;
    let html = check_response(response, &index_url, Some("index page"))?;
    let doc = Html::parse_document(&html);

    let meta = metadata::extract_metadata(&doc, &html, base_url);
    let index = toc::discover_chapters(&doc, base_url);
    if index.is_empty() {
        return Err(ScraperError::EmptyChapterList { url: index_url });
    }

    let end = options.end.unwrap_or(u32::MAX);
    let selected: Vec<_> =
        index.into_iter().filter(|c| c.number >= options.start && c.number <= end).collect();
    let total = selected.len() as u32;

    let mut chapters: Vec<ScrapedChapter> = Vec::new();
    let mut skipped: Vec<SkippedChapter> = Vec::new();

    for (done, link) in selected.iter().enumerate() {
        if let Some(ref progress) = options.progress {
            progress(done as u32 + 1, total);
        }

        let chapter_html = match client.get_with_retry(&link.url) {
            Ok(response) if !response.status().is_success() => {
                let reason = format!("HTTP {}", response.status().as_u16());
                eprintln!("Chapter {}: {} at {}. Skipped.", link.number, reason, link.url);
                skipped.push(SkippedChapter { number: link.number, reason });
                continue;
            }
            Ok(response) => match response.text() {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Chapter {}: failed to read body: {}. Skipped.", link.number, e);
                    skipped.push(SkippedChapter {
                        number: link.number,
                        reason: format!("body read failed: {}", e),
                    });
                    continue;
                }
            },
            Err(e) => {
                eprintln!("Chapter {}: network error at {}: {}. Skipped.", link.number, link.url, e);
                skipped.push(SkippedChapter {
                    number: link.number,
                    reason: format!("network error: {}", e),
                });
                continue;
            }
        };

        let chapter_doc = Html::parse_document(&chapter_html);
        match content::extract_chapter(&chapter_doc) {
            Some(body) if body.chars().count() >= MIN_CHAPTER_CHARS => {
                chapters.push(ScrapedChapter {
                    title: link.title.clone(),
                    content: body,
                    order_number: link.number,
                    source_url: Some(link.url.clone()),
                });
            }
            Some(_) => {
                eprintln!("Chapter {}: content too short at {}. Skipped.", link.number, link.url);
                skipped.push(SkippedChapter {
                    number: link.number,
                    reason: "content shorter than minimum".to_string(),
                });
            }
            None => {
                eprintln!("Chapter {}: no content container at {}. Skipped.", link.number, link.url);
                skipped.push(SkippedChapter {
                    number: link.number,
                    reason: "no content container".to_string(),
                });
            }
        }
    }

    fs::create_dir_all(options.output_dir).map_err(|e| ScraperError::Output {
        path: options.output_dir.to_path_buf(),
        source: e,
    })?;

    let image_path = meta
        .image_url
        .as_deref()
        .and_then(|url| download_cover(client, url, options.output_dir, slug));

    let downloaded = chapters.len() as u32;
    let novel = NovelSubmission {
        name: meta.name,
        author: meta.author,
        description: meta.description.unwrap_or_default(),
        rating: meta.rating,
        status: meta.status,
        source_url: index_url,
        image_path,
        alternative_names: meta.alternative_names,
        genres: meta.genres,
        chapters,
    };

    let json_path = options.output_dir.join(format!("{}.json", slug));
    let file = fs::File::create(&json_path)
        .map_err(|e| ScraperError::Output { path: json_path.clone(), source: e })?;
    serde_json::to_writer_pretty(file, &novel)
        .map_err(|e| ScraperError::Serialize { source: e })?;

    Ok(ScrapeOutcome { novel, json_path, downloaded, skipped })
}
