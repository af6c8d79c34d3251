//! Regex-based text primitives shared by the extractors: spam-line
//! classification, whitespace normalization, the aggressive chapter-body
//! cleaning pass, and noise-aware DOM text collection.

use std::sync::LazyLock;

use regex::{Regex, RegexSet};
use scraper::node::Node;
use scraper::ElementRef;

/// Patterns marking a text block as reader-UI chrome, sponsor begging, or
/// translator noise rather than narrative. Spanish patterns target the
/// source site's boilerplate.
static SPAM_BLOCKS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)aumentar.*fuente",
        r"(?i)reducir.*fuente",
        r"(?i)restablecer.*fuente",
        r"(?i)pagina\s+anterior",
        r"(?i)pagina\s+siguiente",
        r"(?i)patrocin",
        r"(?i)invitame\s+un\s+cafe",
        r"(?i)donativo",
        r"(?i)\$.*=.*cap",
        r"(?i)^NT:",
        r"(?i)^TL:",
        r"(?i)skydark",
        r"(?i)click\s+to\s+rate",
        r"(?i)\[Total:.*Average:",
    ])
    .expect("spam block patterns")
});

/// Line-level spam stripped during the secondary cleaning pass. Applied with
/// multiline anchors so a single polluted line disappears without touching
/// its neighbors.
static SPAM_LINES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)^.*aumentar.*fuente.*$",
        r"(?im)^.*reducir.*fuente.*$",
        r"(?im)^.*pagina\s+anterior.*$",
        r"(?im)^.*patrocin.*\d+\$.*$",
        r"(?im)^.*invitame\s+un\s+cafe.*$",
        r"(?im)^NT:.*$",
        r"(?im)^TL:.*$",
        r"(?m)^\s*\d+\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("spam line pattern"))
    .collect()
});

/// The site's recurring "read on the original site" notice paragraph.
static READER_NOTICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Si estas leyendo las novelas.*?gringos.*?\.").expect("reader notice pattern")
});

/// Sponsor pitch blocks that span several sentences up to a chapter-price
/// mention.
static SPONSOR_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:Patrocinio|patrocinar|Invitame).*?(?:\$|dolares).*?(?:cap|capitulo)")
        .expect("sponsor block pattern")
});

static MULTI_BLANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("space run pattern"));
static WS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws run pattern"));

/// Classify one extracted text block as spam/noise.
///
/// Besides the pattern set, very short blocks mentioning money are treated
/// as spam (chapter-price lines come in many spellings).
pub fn is_spam_block(text: &str) -> bool {
    if SPAM_BLOCKS.is_match(text) {
        return true;
    }
    text.chars().count() < 50 && text.contains('$')
}

/// Collapse all whitespace runs (including newlines) to single spaces and
/// trim. Used on single-line metadata values.
pub fn collapse_whitespace(s: &str) -> String {
    WS_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Secondary cleaning pass over an assembled chapter body: collapse blank
/// runs and double spaces, strip line-level spam and bare page numbers,
/// remove the known boilerplate blocks, then re-join non-empty lines with
/// blank-line separators.
pub fn clean_chapter_body(content: &str) -> String {
    let mut content = MULTI_BLANK.replace_all(content, "\n\n").into_owned();
    content = MULTI_SPACE.replace_all(&content, " ").into_owned();

    for re in SPAM_LINES.iter() {
        content = re.replace_all(&content, "").into_owned();
    }

    content = READER_NOTICE.replace_all(&content, "").into_owned();
    content = SPONSOR_BLOCK.replace_all(&content, "").into_owned();

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Concatenate the text of an element's subtree, skipping any descendant
/// element (and its whole subtree) for which `is_noise` returns true. Text
/// nodes are appended verbatim, so source newlines survive for the
/// labeled-line regexes.
pub fn text_excluding<F>(root: ElementRef<'_>, is_noise: &F) -> String
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    let mut out = String::new();
    collect_text(root, is_noise, &mut out);
    out
}

fn collect_text<F>(el: ElementRef<'_>, is_noise: &F, out: &mut String)
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    if is_noise(&el) {
        return;
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, is_noise, out);
                }
            }
            _ => {}
        }
    }
}

/// Text of one block element with each fragment trimmed and fragments
/// joined by single spaces, skipping noise subtrees.
pub fn block_text<F>(el: ElementRef<'_>, is_noise: &F) -> String
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    let mut fragments: Vec<String> = Vec::new();
    collect_fragments(el, is_noise, &mut fragments);
    fragments.join(" ")
}

fn collect_fragments<F>(el: ElementRef<'_>, is_noise: &F, out: &mut Vec<String>)
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    if is_noise(&el) {
        return;
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_fragments(child_el, is_noise, out);
                }
            }
            _ => {}
        }
    }
}

/// Flattened text of the whole document, script and style contents
/// included, exactly as it appears in the markup.
pub fn page_text(doc: &scraper::Html) -> String {
    text_excluding(doc.root_element(), &|_| false)
}
