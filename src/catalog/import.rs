//! Idempotent multi-entity import of a scraped novel into the catalog.
//!
//! Only two conditions abort an import, both before any write: a validation
//! failure and a name conflict. Every later step is additive; a cover
//! failure degrades to `cover_uploaded = false`, and chapters are upserted
//! so a retried import converges instead of duplicating. Chapter writes are
//! committed in batches to bound transaction size on large imports; a fatal
//! store error mid-loop leaves earlier batches committed, which is safe to
//! resume because the upsert is keyed on (novel, order_number).

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::cover;
use crate::catalog::store::Catalog;
use crate::model::{ImportResponse, ImportStats, NovelSubmission, ScrapedChapter};

/// Chapter writes per transaction.
pub const CHAPTER_BATCH_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("A novel named '{name}' already exists (id {id})")]
    Conflict { name: String, id: i64 },

    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Catalog error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Drives one import against a catalog. The upload directory is explicit
/// construction-time configuration; there is no process-wide state.
pub struct Importer<'a> {
    catalog: &'a Catalog,
    upload_dir: PathBuf,
}

impl<'a> Importer<'a> {
    pub fn new(catalog: &'a Catalog, upload_dir: impl Into<PathBuf>) -> Self {
        Self { catalog, upload_dir: upload_dir.into() }
    }

    /// Import a full submission: novel record, cover, alternate names,
    /// genres, chapters.
    pub fn import(&self, submission: &NovelSubmission) -> Result<ImportResponse, ImportError> {
        submission.validate().map_err(ImportError::Validation)?;

        if let Some(id) = self.catalog.find_novel_by_name(&submission.name)? {
            return Err(ImportError::Conflict { name: submission.name.clone(), id });
        }

        let novel_id = self.catalog.insert_novel(submission)?;
        tracing::info!(novel_id, name = %submission.name, "novel created");

        let cover_uploaded = self.store_cover(submission, novel_id)?;

        let mut stats = ImportStats { cover_uploaded, ..ImportStats::default() };

        for name in &submission.alternative_names {
            self.catalog.insert_novel_name(novel_id, name)?;
            stats.alternative_names_created += 1;
        }
        if stats.alternative_names_created > 0 {
            tracing::info!(count = stats.alternative_names_created, "alternate names created");
        }

        for genre_name in &submission.genres {
            let normalized = genre_name.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            let genre_id = match self.catalog.find_genre_by_name(&normalized)? {
                Some(id) => id,
                None => {
                    let id = self.catalog.insert_genre(&normalized)?;
                    stats.genres_created += 1;
                    tracing::info!(genre = %normalized, "genre created");
                    id
                }
            };
            // Cannot collide for a novel created above, but this step is
            // reentrant when invoked standalone.
            if !self.catalog.association_exists(novel_id, genre_id)? {
                self.catalog.insert_association(novel_id, genre_id)?;
                stats.genres_associated += 1;
            }
        }

        let (created, updated) = self.upsert_chapters(novel_id, &submission.chapters)?;
        stats.chapters_created = created;
        stats.chapters_updated = updated;
        tracing::info!(created, updated, "chapters processed");

        let message = if updated > 0 && created == 0 {
            format!("Novel '{}' already existed, chapters updated", submission.name)
        } else if created > 0 && updated > 0 {
            format!("Novel '{}' partially updated", submission.name)
        } else {
            format!("Novel '{}' imported successfully", submission.name)
        };

        Ok(ImportResponse { success: true, novel_id, message, stats })
    }

    /// Upsert chapters by (novel, order_number), committing every
    /// [CHAPTER_BATCH_SIZE] writes plus a final commit for the remainder.
    /// Returns (created, updated).
    pub fn upsert_chapters(
        &self,
        novel_id: i64,
        chapters: &[ScrapedChapter],
    ) -> Result<(u32, u32), ImportError> {
        let mut created = 0u32;
        let mut updated = 0u32;
        for batch in chapters.chunks(CHAPTER_BATCH_SIZE) {
            let tx = self.catalog.begin()?;
            for chapter in batch {
                match self.catalog.find_chapter(novel_id, chapter.order_number)? {
                    Some(chapter_id) => {
                        self.catalog.update_chapter(chapter_id, chapter)?;
                        updated += 1;
                    }
                    None => {
                        self.catalog.insert_chapter(novel_id, chapter)?;
                        created += 1;
                    }
                }
            }
            tx.commit()?;
            tracing::debug!(processed = created + updated, "chapter batch committed");
        }
        Ok((created, updated))
    }

    /// Best-effort cover transcode. Store errors propagate; image errors
    /// only clear the flag.
    fn store_cover(
        &self,
        submission: &NovelSubmission,
        novel_id: i64,
    ) -> Result<bool, ImportError> {
        let Some(image_path) = submission.image_path.as_deref() else {
            return Ok(false);
        };
        match cover::process_cover(Path::new(image_path), &self.upload_dir, novel_id) {
            Ok(public_path) => {
                self.catalog.set_cover_path(novel_id, &public_path)?;
                tracing::info!(novel_id, path = %public_path, "cover stored");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(novel_id, error = %e, "cover processing failed, import continues");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NovelStatus;

    fn chapter(n: u32, content: &str) -> ScrapedChapter {
        ScrapedChapter {
            title: format!("Capítulo {}", n),
            content: content.to_string(),
            order_number: n,
            source_url: None,
        }
    }

    fn submission(name: &str, chapters: Vec<ScrapedChapter>) -> NovelSubmission {
        NovelSubmission {
            name: name.to_string(),
            author: "Autor de Prueba".to_string(),
            description: String::new(),
            rating: None,
            status: NovelStatus::Ongoing,
            source_url: "https://novelasligera.com/novela/test/".to_string(),
            image_path: None,
            alternative_names: vec![],
            genres: vec![],
            chapters,
        }
    }

    fn importer_env() -> (Catalog, tempfile::TempDir) {
        (Catalog::open_in_memory().unwrap(), tempfile::tempdir().unwrap())
    }

    #[test]
    fn fresh_import_counts_every_entity() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());

        let mut sub = submission(
            "Test Novel",
            vec![chapter(1, "contenido uno"), chapter(2, "contenido dos")],
        );
        sub.genres = vec!["drama".to_string()];

        let response = importer.import(&sub).unwrap();
        assert!(response.success);
        assert_eq!(
            response.stats,
            ImportStats {
                alternative_names_created: 0,
                genres_created: 1,
                genres_associated: 1,
                chapters_created: 2,
                chapters_updated: 0,
                cover_uploaded: false,
            }
        );
        assert_eq!(response.message, "Novel 'Test Novel' imported successfully");
        assert_eq!(catalog.novel_count().unwrap(), 1);
        assert_eq!(catalog.chapter_count(response.novel_id).unwrap(), 2);
    }

    #[test]
    fn reimport_same_name_is_a_conflict() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let sub = submission("Test Novel", vec![chapter(1, "contenido")]);

        importer.import(&sub).unwrap();
        let err = importer.import(&sub).unwrap_err();
        assert!(matches!(err, ImportError::Conflict { .. }));
        assert_eq!(catalog.novel_count().unwrap(), 1);
    }

    #[test]
    fn genre_normalization_is_idempotent() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let mut sub = submission("Test Novel", vec![]);
        sub.genres =
            vec!["Fantasy".to_string(), "fantasy".to_string(), " Fantasy ".to_string()];

        let response = importer.import(&sub).unwrap();
        assert_eq!(response.stats.genres_created, 1);
        assert_eq!(response.stats.genres_associated, 1);
        assert_eq!(catalog.genre_count().unwrap(), 1);
        assert_eq!(catalog.association_count(response.novel_id).unwrap(), 1);
    }

    #[test]
    fn alternative_names_are_created_per_entry() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let mut sub = submission("Test Novel", vec![]);
        sub.alternative_names = vec!["TN".to_string(), "Test Romance".to_string()];

        let response = importer.import(&sub).unwrap();
        assert_eq!(response.stats.alternative_names_created, 2);
        assert_eq!(catalog.novel_name_count(response.novel_id).unwrap(), 2);
    }

    #[test]
    fn missing_cover_file_does_not_fail_import() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let mut sub = submission("Test Novel", vec![chapter(1, "contenido")]);
        sub.image_path = Some("/no/existe/portada.png".to_string());

        let response = importer.import(&sub).unwrap();
        assert!(response.success);
        assert!(!response.stats.cover_uploaded);
        assert_eq!(catalog.novel_cover_path(response.novel_id).unwrap(), None);
    }

    #[test]
    fn cover_is_transcoded_and_recorded() {
        let (catalog, dir) = importer_env();
        let upload_dir = dir.path().join("static");
        let importer = Importer::new(&catalog, &upload_dir);

        let source = dir.path().join("portada.png");
        let mut rgba = image::RgbaImage::new(3, 3);
        for px in rgba.pixels_mut() {
            *px = image::Rgba([10, 20, 30, 255]);
        }
        rgba.save(&source).unwrap();

        let mut sub = submission("Test Novel", vec![]);
        sub.image_path = Some(source.to_string_lossy().into_owned());

        let response = importer.import(&sub).unwrap();
        assert!(response.stats.cover_uploaded);
        let expected = format!("/static/novels/{}.jpg", response.novel_id);
        assert_eq!(catalog.novel_cover_path(response.novel_id).unwrap().as_deref(), Some(expected.as_str()));
        assert!(upload_dir.join(format!("{}.jpg", response.novel_id)).is_file());
    }

    #[test]
    fn validation_failure_writes_nothing() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let mut sub = submission("Test Novel", vec![]);
        sub.rating = Some(11.0);

        let err = importer.import(&sub).unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
        assert_eq!(catalog.novel_count().unwrap(), 0);
    }

    #[test]
    fn chapter_upsert_updates_in_place() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let sub = submission(
            "Test Novel",
            vec![chapter(1, "versión vieja"), chapter(2, "capítulo dos")],
        );
        let response = importer.import(&sub).unwrap();
        assert_eq!(response.stats.chapters_created, 2);

        // Re-invoke the upsert step directly with changed content.
        let revised = vec![chapter(1, "versión nueva"), chapter(2, "capítulo dos")];
        let (created, updated) =
            importer.upsert_chapters(response.novel_id, &revised).unwrap();
        assert_eq!(created, 0);
        assert_eq!(updated, 2);
        assert_eq!(catalog.chapter_count(response.novel_id).unwrap(), 2);
        assert_eq!(
            catalog.chapter_content(response.novel_id, 1).unwrap().as_deref(),
            Some("versión nueva")
        );
    }

    #[test]
    fn duplicate_ordinal_in_one_submission_is_partial_update() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let sub = submission(
            "Test Novel",
            vec![chapter(1, "primera versión"), chapter(1, "segunda versión"), chapter(2, "dos")],
        );
        let response = importer.import(&sub).unwrap();
        assert_eq!(response.stats.chapters_created, 2);
        assert_eq!(response.stats.chapters_updated, 1);
        assert_eq!(response.message, "Novel 'Test Novel' partially updated");
        assert_eq!(
            catalog.chapter_content(response.novel_id, 1).unwrap().as_deref(),
            Some("segunda versión")
        );
    }

    #[test]
    fn large_imports_commit_in_batches() {
        let (catalog, dir) = importer_env();
        let importer = Importer::new(&catalog, dir.path());
        let chapters: Vec<_> = (1..=120).map(|n| chapter(n, "contenido")).collect();
        let response = importer.import(&submission("Larga", chapters)).unwrap();
        assert_eq!(response.stats.chapters_created, 120);
        assert_eq!(catalog.chapter_count(response.novel_id).unwrap(), 120);
    }
}
