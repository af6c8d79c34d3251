//! Submission quality checks run before a JSON file is sent to the import
//! endpoint.
//!
//! Errors gate the exit code: required fields present, no empty chapters,
//! ordinals sorted and contiguous. Warnings flag quality problems worth a
//! manual look (sentinel title/author, short description, spam residue)
//! without failing the run.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

use crate::model::{NovelSubmission, UNKNOWN_AUTHOR, UNKNOWN_TITLE};

/// Spam residue checked against chapter contents, with a human label per
/// pattern.
static SPAM_RESIDUE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)patrocin", "sponsor mentions"),
        (r"(?i)invitame.*cafe", "coffee donation lines"),
        (r"(?i)\$.*=.*cap", "chapter price lines"),
        (r"(?i)aumentar.*fuente", "font-size controls"),
        (r"(?i)pagina\s+anterior", "page navigation"),
    ]
    .iter()
    .map(|(p, label)| (Regex::new(p).expect("spam residue pattern"), *label))
    .collect()
});

/// Chapters shorter than this are flagged (same floor the scraper enforces).
const SHORT_CHAPTER_CHARS: usize = 500;

/// Verification outcome. Valid means no errors; warnings never fail.
#[derive(Debug, Default)]
pub struct Report {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable dump to stderr, one section per severity.
    pub fn print(&self) {
        if !self.info.is_empty() {
            eprintln!("Info:");
            for msg in &self.info {
                eprintln!("  - {}", msg);
            }
        }
        if !self.warnings.is_empty() {
            eprintln!("Warnings:");
            for msg in &self.warnings {
                eprintln!("  - {}", msg);
            }
        }
        if !self.errors.is_empty() {
            eprintln!("Errors:");
            for msg in &self.errors {
                eprintln!("  - {}", msg);
            }
        }
        if self.is_valid() {
            eprintln!("OK: submission is ready for import");
        } else {
            eprintln!("INVALID: {} error(s) found", self.errors.len());
        }
    }
}

/// Load and verify a submission file.
pub fn verify_file(path: &Path) -> anyhow::Result<Report> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let submission: NovelSubmission = serde_json::from_str(&raw)
        .with_context(|| format!("invalid submission JSON in {}", path.display()))?;
    Ok(verify_submission(&submission))
}

/// Run all checks against one submission.
pub fn verify_submission(submission: &NovelSubmission) -> Report {
    let mut report = Report::default();
    check_basic_fields(submission, &mut report);
    check_chapter_ordinals(submission, &mut report);
    check_content_quality(submission, &mut report);
    check_spam_residue(submission, &mut report);
    report
}

fn check_basic_fields(submission: &NovelSubmission, report: &mut Report) {
    if submission.name.is_empty() {
        report.errors.push("missing required field: name".to_string());
    }
    if submission.author.is_empty() {
        report.errors.push("missing required field: author".to_string());
    }
    if submission.chapters.is_empty() {
        report.errors.push("submission has no chapters".to_string());
    }

    if submission.name == UNKNOWN_TITLE {
        report.warnings.push("title is the extraction sentinel; set it manually".to_string());
    }
    if submission.author == UNKNOWN_AUTHOR {
        report
            .warnings
            .push("author is unknown; consider finding this information manually".to_string());
    }
    if submission.description.chars().count() < 50 {
        report.warnings.push("description is short or empty".to_string());
    }
}

fn check_chapter_ordinals(submission: &NovelSubmission, report: &mut Report) {
    let ordinals: Vec<u32> = submission.chapters.iter().map(|c| c.order_number).collect();
    if ordinals.is_empty() {
        return;
    }
    report.info.push(format!("total chapters: {}", ordinals.len()));

    if ordinals.windows(2).any(|w| w[0] > w[1]) {
        report.errors.push("chapter ordinals are not sorted ascending".to_string());
    } else if ordinals.windows(2).any(|w| w[1] != w[0] + 1) {
        // Only meaningful once sorted; duplicates surface here too.
        let gaps: Vec<String> = ordinals
            .windows(2)
            .filter(|w| w[1] != w[0] + 1)
            .map(|w| format!("{}..{}", w[0], w[1]))
            .collect();
        report.errors.push(format!("chapter ordinals are not contiguous: {}", gaps.join(", ")));
    }
}

fn check_content_quality(submission: &NovelSubmission, report: &mut Report) {
    let mut empty: Vec<u32> = Vec::new();
    let mut short: Vec<u32> = Vec::new();
    let mut total_chars: usize = 0;

    for chapter in &submission.chapters {
        let len = chapter.content.chars().count();
        total_chars += len;
        if len == 0 {
            empty.push(chapter.order_number);
        } else if len < SHORT_CHAPTER_CHARS {
            short.push(chapter.order_number);
        }
    }

    if !submission.chapters.is_empty() {
        report
            .info
            .push(format!("average chapter length: {} chars", total_chars / submission.chapters.len()));
    }
    if !empty.is_empty() {
        report.errors.push(format!("empty chapters: {}", join_ordinals(&empty)));
    }
    if !short.is_empty() {
        report.warnings.push(format!(
            "chapters shorter than {} chars: {}",
            SHORT_CHAPTER_CHARS,
            join_ordinals(&short)
        ));
    }
}

fn check_spam_residue(submission: &NovelSubmission, report: &mut Report) {
    for (pattern, label) in SPAM_RESIDUE.iter() {
        let affected: Vec<u32> = submission
            .chapters
            .iter()
            .filter(|c| pattern.is_match(&c.content))
            .map(|c| c.order_number)
            .collect();
        if affected.len() > 3 {
            report
                .warnings
                .push(format!("spam residue ({}): {} chapters affected", label, affected.len()));
        }
    }
}

fn join_ordinals(ordinals: &[u32]) -> String {
    ordinals.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}
