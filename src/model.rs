//! Canonical data model for scraped fiction and catalog import.
//!
//! The scraper produces a [NovelSubmission]; the verify, upload, and import
//! tools all consume the same shape. This is the single source of truth for
//! the wire format.

use serde::{Deserialize, Serialize};

/// Author value used when no plausible author could be extracted.
/// The verify tool warns when it survives into a submission.
pub const UNKNOWN_AUTHOR: &str = "Desconocido";

/// Title value used when no heading could be extracted at all.
pub const UNKNOWN_TITLE: &str = "Título Desconocido";

/// Publication status of a novel on the source site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NovelStatus {
    #[default]
    Ongoing,
    Completed,
    Hiatus,
    Dropped,
}

impl NovelStatus {
    /// Stable string form, matching the wire/database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            NovelStatus::Ongoing => "ongoing",
            NovelStatus::Completed => "completed",
            NovelStatus::Hiatus => "hiatus",
            NovelStatus::Dropped => "dropped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ongoing" => Some(NovelStatus::Ongoing),
            "completed" => Some(NovelStatus::Completed),
            "hiatus" => Some(NovelStatus::Hiatus),
            "dropped" => Some(NovelStatus::Dropped),
            _ => None,
        }
    }
}

/// One entry in a novel's chapter index, before the chapter body is fetched.
///
/// `number == 0` means the ordinal could not be parsed from either the URL
/// or the link title; such entries sort first so extraction failures are
/// visible instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLink {
    pub url: String,
    pub title: String,
    pub number: u32,
}

/// One fully fetched and cleaned chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedChapter {
    pub title: String,
    pub content: String,
    /// 1-based position within the novel.
    pub order_number: u32,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Complete scrape result / import submission for one novel.
///
/// Serialized to `{output}/{slug}.json` by the scraper and consumed verbatim
/// by `verify`, `upload`, and `import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelSubmission {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub status: NovelStatus,
    pub source_url: String,
    /// Local filesystem path to the downloaded cover, if any.
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub alternative_names: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub chapters: Vec<ScrapedChapter>,
}

impl NovelSubmission {
    /// Field-bound validation mirroring the import endpoint's schema.
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.chars().count() > 200 {
            return Err("name must be 1..=200 characters".to_string());
        }
        if self.author.is_empty() || self.author.chars().count() > 200 {
            return Err("author must be 1..=200 characters".to_string());
        }
        if self.description.chars().count() > 5000 {
            return Err("description must be at most 5000 characters".to_string());
        }
        if let Some(r) = self.rating {
            if !(0.0..=10.0).contains(&r) {
                return Err(format!("rating {} out of range 0..=10", r));
            }
        }
        if self.source_url.is_empty() {
            return Err("source_url is required".to_string());
        }
        for (i, ch) in self.chapters.iter().enumerate() {
            if ch.title.is_empty() || ch.title.chars().count() > 300 {
                return Err(format!("chapter {}: title must be 1..=300 characters", i + 1));
            }
            if ch.order_number < 1 {
                return Err(format!("chapter {}: order_number must be >= 1", i + 1));
            }
        }
        Ok(())
    }
}

/// Counters describing what one import actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub alternative_names_created: u32,
    pub genres_created: u32,
    pub genres_associated: u32,
    pub chapters_created: u32,
    pub chapters_updated: u32,
    pub cover_uploaded: bool,
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub novel_id: i64,
    pub message: String,
    pub stats: ImportStats,
}
