//! Novel-page metadata extraction.
//!
//! Each field is resolved by an ordered chain of strategies (structural
//! selectors, then labeled-line regexes over the flattened page text, then
//! raw-markup fallbacks) and degrades to a documented default instead of
//! failing. The page structure is NovelasLigera's, which drifts over time;
//! the chains exist because no single selector has survived a redesign yet.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::model::{NovelStatus, UNKNOWN_AUTHOR, UNKNOWN_TITLE};
use crate::scraper::text::{collapse_whitespace, page_text, text_excluding};

/// Metadata fields of one novel index page, before chapters are fetched.
#[derive(Debug, Clone)]
pub struct NovelMetadata {
    pub name: String,
    pub author: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub status: NovelStatus,
    pub image_url: Option<String>,
    pub alternative_names: Vec<String>,
    pub genres: Vec<String>,
}

const TITLE_SELECTORS: [&str; 4] =
    ["h1.entry-title", "h1.novel-title", ".post-title h1", "header h1"];

const IMAGE_SELECTORS: [&str; 9] = [
    ".elementor-widget-image img",
    ".featured-image img",
    ".post-thumbnail img",
    "img.summary_image",
    "img.novel-cover",
    "img.wp-post-image",
    r#"img[itemprop="image"]"#,
    ".entry-header img",
    ".novel-cover img",
];

/// Attribute priority for lazy-loading image markup.
const IMAGE_ATTRS: [&str; 4] = ["data-lazy-src", "data-src", "src", "data-original"];

/// Substrings marking a placeholder / not-yet-loaded image source.
const IMAGE_SENTINELS: [&str; 4] = ["data:image", "placeholder", "loading", "lazy"];

static AUTHOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Autor:\s*([^\n]+)").expect("author pattern"));
static AUTHOR_TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Traductor:|Plan de publicación:|Estado:").expect("author trailer pattern")
});
static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Estado:\s*(.+?)(?:\n|Tipo:)").expect("status pattern"));
static GENRE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Género:\s*(.+?)(?:\n|$)").expect("genre pattern"));
static RATING_AVERAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Average:\s*(\d+\.?\d*)").expect("rating pattern"));
static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("number pattern"));
static DESCRIPTION_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)-novela\s+(.*?)\s+Estado:").expect("description pattern"));
static ALT_NAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Z][A-Za-z\s]+?)-novela").expect("alt name pattern"));
static ACRONYM_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{3,})\s*–").expect("acronym pattern"));

static IMAGE_RAW_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)<meta\s+property=["']og:image["']\s+content=["']([^"']+)["']"#,
        r#"(?i)<img[^>]+class=["'](?:summary_image|novel-cover|wp-post-image|featured-image)["'][^>]+(?:data-lazy-src|data-src|src)=["']([^"']+)["']"#,
        r#"(?i)<img[^>]+(?:data-lazy-src|data-src|src)=["']([^"']+)["'][^>]+class=["'](?:summary_image|novel-cover|wp-post-image|featured-image)["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("image raw pattern"))
    .collect()
});

static DESCRIPTION_CLEANERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Sorry,?\s+you\s+have\s+Javascript\s+Disabled!?",
        r"(?i)To\s+see\s+this\s+page\s+as\s+it\s+is\s+meant\s+to\s+appear,?\s+please\s+enable\s+your\s+Javascript!?",
        r"(?i)Saltar\s+al\s+contenido",
        r"(?i)Menú",
        r"(?i)Novelas\s+Chinas",
        r"(?i)Novelas\s+Coreanas",
        r"(?i)Novelas\s+Japonesas",
        r"(?i)Novelas\s+\+18",
        r"(?i)Reclutamiento\s+y\s+Otros",
        r"(?i)Reclutamiento",
        r"(?i)CONTACTO",
        r"(?is)Click\s+to\s+rate.*?\[Total:.*?Average:.*?\]",
        r"(?is)\[Total:.*?Average:.*?\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("description cleaner"))
    .collect()
});

/// Field-label trailers that mark the end of descriptive text when metadata
/// lines got flattened into the same region.
static DESCRIPTION_TRAILERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)Estado:.*$",
        r"(?is)Género:.*$",
        r"(?is)Autor:.*$",
        r"(?is)Traductor:.*$",
        r"(?is)Tipo:.*$",
        r"(?is)Original:.*$",
        r"(?is)Plan de publicación:.*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("description trailer"))
    .collect()
});

fn selector(sel: &str) -> Selector {
    Selector::parse(sel).expect("static selector")
}

/// Extract all metadata fields from a parsed novel index page.
///
/// `raw_html` is the unparsed markup, used by the rating and cover fallbacks
/// that look at attributes the DOM pass may have normalized away.
pub fn extract_metadata(doc: &Html, raw_html: &str, base_url: &str) -> NovelMetadata {
    let text = page_text(doc);
    let name = extract_title(doc);
    NovelMetadata {
        author: extract_author(&text),
        description: extract_description(doc, &name),
        rating: extract_rating(doc, raw_html),
        status: extract_status(&text),
        image_url: extract_image(doc, raw_html, base_url),
        alternative_names: extract_alternative_names(&text, &name),
        genres: extract_genres(&text),
        name,
    }
}

/// Title: known heading containers, then the first `h1`, then the sentinel.
pub fn extract_title(doc: &Html) -> String {
    for sel in TITLE_SELECTORS {
        let sel = selector(sel);
        if let Some(el) = doc.select(&sel).next() {
            let title = el.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                return title;
            }
        }
    }
    let h1 = selector("h1");
    doc.select(&h1)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

/// Author: the `Autor:` labeled line, cut at any trailing sibling label.
/// Implausible candidates (other field labels, over-long captures) fall back
/// to the unknown sentinel.
pub fn extract_author(text: &str) -> String {
    if let Some(caps) = AUTHOR_LINE.captures(text) {
        let mut candidate = caps[1].to_string();
        if let Some(m) = AUTHOR_TRAILER.find(&candidate) {
            candidate.truncate(m.start());
        }
        let candidate = collapse_whitespace(&candidate);
        let lower = candidate.to_lowercase();
        if !candidate.is_empty()
            && lower != "desconocido"
            && lower != "unknown"
            && !lower.contains("traductor")
            && !lower.contains("plan de publicación")
            && candidate.chars().count() < 100
        {
            return candidate;
        }
    }
    UNKNOWN_AUTHOR.to_string()
}

fn is_nav_noise(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "nav" | "header" | "footer" | "noscript")
        || el
            .value()
            .classes()
            .any(|c| matches!(c, "menu" | "navigation" | "skip-link"))
}

/// Description: text between the `<Name>-novela` header token (or the title
/// itself) and the `Estado:` label, computed over nav-stripped text, then
/// cleaned. Accepted only when more than 50 characters survive cleaning;
/// truncated to 2000.
pub fn extract_description(doc: &Html, title: &str) -> Option<String> {
    let text = text_excluding(doc.root_element(), &is_nav_noise);

    let raw = DESCRIPTION_SPAN
        .captures(&text)
        .map(|caps| caps[1].to_string())
        .or_else(|| span_between(&text, title, "Estado:"))?;

    clean_description(&raw, title)
}

/// Slice of `text` strictly between the first occurrence of `start` and the
/// next occurrence of `end` after it.
fn span_between(text: &str, start: &str, end: &str) -> Option<String> {
    let from = text.find(start)? + start.len();
    let to = text[from..].find(end)? + from;
    Some(text[from..to].to_string())
}

fn clean_description(raw: &str, title: &str) -> Option<String> {
    let mut description = raw.to_string();
    for re in DESCRIPTION_CLEANERS.iter() {
        description = re.replace_all(&description, "").into_owned();
    }
    // The page tends to repeat its own title around the synopsis block.
    if !title.is_empty() {
        let title_re = Regex::new(&format!(r"(?i){}(-novela)?", regex::escape(title))).ok()?;
        description = title_re.replace_all(&description, "").into_owned();
    }
    for re in DESCRIPTION_TRAILERS.iter() {
        description = re.replace_all(&description, "").into_owned();
    }
    let description = collapse_whitespace(&description);
    if description.chars().count() > 50 {
        Some(description.chars().take(2000).collect())
    } else {
        None
    }
}

/// Rating: `Average:` marker in the raw markup, then rating/score elements,
/// then data attributes. Clamped to 0..=10.
pub fn extract_rating(doc: &Html, raw_html: &str) -> Option<f64> {
    rating_from_raw(raw_html)
        .or_else(|| rating_from_elements(doc))
        .or_else(|| rating_from_attributes(doc))
        .map(|r| r.clamp(0.0, 10.0))
}

pub fn rating_from_raw(raw_html: &str) -> Option<f64> {
    RATING_AVERAGE.captures(raw_html)?[1].parse().ok()
}

pub fn rating_from_elements(doc: &Html) -> Option<f64> {
    let sel = selector(
        r#"span[class*="rating"], span[class*="score"], div[class*="rating"], div[class*="score"]"#,
    );
    let el = doc.select(&sel).next()?;
    let text = el.text().collect::<String>();
    NUMBER_TOKEN.captures(&text)?[1].parse().ok()
}

pub fn rating_from_attributes(doc: &Html) -> Option<f64> {
    let sel = selector(r#"[data-rating], [itemprop="ratingValue"]"#);
    let el = doc.select(&sel).next()?;
    let value = el.value().attr("data-rating").or_else(|| el.value().attr("content"))?;
    NUMBER_TOKEN.captures(value)?[1].parse().ok()
}

/// Status keyword classification. The site phrases ongoing works as
/// "En traducción".
pub fn extract_status(text: &str) -> NovelStatus {
    let Some(caps) = STATUS_LINE.captures(text) else {
        return NovelStatus::Ongoing;
    };
    let status = caps[1].to_lowercase();
    if status.contains("traducci") {
        NovelStatus::Ongoing
    } else if ["completado", "finalizado", "completed"].iter().any(|w| status.contains(w)) {
        NovelStatus::Completed
    } else if ["pausa", "hiato", "hiatus"].iter().any(|w| status.contains(w)) {
        NovelStatus::Hiatus
    } else if ["abandonad", "dropped"].iter().any(|w| status.contains(w)) {
        NovelStatus::Dropped
    } else {
        NovelStatus::Ongoing
    }
}

/// Genres: the `Género:` labeled line split on commas/periods, normalized to
/// lowercase, capped at 10.
pub fn extract_genres(text: &str) -> Vec<String> {
    let Some(caps) = GENRE_LINE.captures(text) else {
        return Vec::new();
    };
    caps[1]
        .split([',', '.'])
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .take(10)
        .collect()
}

/// Cover image: og:image meta, then known image containers with
/// lazy-loading attribute priority, then raw-markup regexes. Placeholder
/// sources are rejected at every stage; the accepted locator is normalized
/// to an absolute URL.
pub fn extract_image(doc: &Html, raw_html: &str, base_url: &str) -> Option<String> {
    image_from_meta(doc, base_url)
        .or_else(|| image_from_selectors(doc, base_url))
        .or_else(|| image_from_raw(raw_html, base_url))
}

fn accept_image(src: &str, base_url: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || IMAGE_SENTINELS.iter().any(|s| src.contains(s)) {
        return None;
    }
    if let Some(rest) = src.strip_prefix("//") {
        Some(format!("https://{}", rest))
    } else if src.starts_with('/') {
        Some(format!("{}{}", base_url, src))
    } else {
        Some(src.to_string())
    }
}

pub fn image_from_meta(doc: &Html, base_url: &str) -> Option<String> {
    let sel = selector(r#"meta[property="og:image"]"#);
    let content = doc.select(&sel).next()?.value().attr("content")?;
    accept_image(content, base_url)
}

pub fn image_from_selectors(doc: &Html, base_url: &str) -> Option<String> {
    for sel in IMAGE_SELECTORS {
        let sel = selector(sel);
        if let Some(img) = doc.select(&sel).next() {
            let src = IMAGE_ATTRS.iter().find_map(|attr| img.value().attr(attr));
            if let Some(accepted) = src.and_then(|s| accept_image(s, base_url)) {
                return Some(accepted);
            }
        }
    }
    None
}

pub fn image_from_raw(raw_html: &str, base_url: &str) -> Option<String> {
    for re in IMAGE_RAW_PATTERNS.iter() {
        if let Some(caps) = re.captures(raw_html) {
            if let Some(accepted) = accept_image(&caps[1], base_url) {
                return Some(accepted);
            }
        }
    }
    None
}

/// Alternate names: the English title line preceding the `-novela` marker
/// (when distinct from the primary name) plus the most frequent all-caps
/// acronym used in chapter titles. Deduplicated, at most 5.
pub fn extract_alternative_names(text: &str, primary: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    if let Some(caps) = ALT_NAME_LINE.captures(text) {
        let original = caps[1].trim().to_string();
        if !original.is_empty() && original != primary {
            names.push(original);
        }
    }

    if let Some(acronym) = most_frequent_acronym(text) {
        if !names.contains(&acronym) && acronym != primary {
            names.push(acronym);
        }
    }

    names.truncate(5);
    names
}

fn most_frequent_acronym(text: &str) -> Option<String> {
    let mut counts: Vec<(String, u32)> = Vec::new();
    for caps in ACRONYM_TOKEN.captures_iter(text) {
        let token = caps[1].to_string();
        match counts.iter_mut().find(|(t, _)| *t == token) {
            Some((_, n)) => *n += 1,
            None => counts.push((token, 1)),
        }
    }
    // First-seen order breaks ties (max_by_key keeps the last maximum).
    counts.into_iter().rev().max_by_key(|(_, n)| *n).map(|(t, _)| t)
}
