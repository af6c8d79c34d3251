//! Chapter-page content extraction: locate the narrative container, drop
//! noise subtrees, keep plausible narrative blocks, and run the secondary
//! cleaning pass.

use scraper::{ElementRef, Html, Selector};

use crate::scraper::text::{block_text, clean_chapter_body, is_spam_block};

/// Narrative containers in preference order.
const CONTENT_SELECTORS: [&str; 5] = [
    ".entry-content",
    ".chapter-content",
    "article .content",
    ".post-content",
    r#"div[itemprop="articleBody"]"#,
];

/// Ad, share, and widget classes whose subtrees never contain narrative.
const NOISE_CLASSES: [&str; 8] = [
    "ads",
    "social-share",
    "sharedaddy",
    "jp-relatedposts",
    "wpcnt",
    "code-block",
    "adsbox",
    "adsbygoogle",
];

/// Minimum character count for a block to be considered narrative.
const MIN_BLOCK_CHARS: usize = 30;

fn is_noise(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "script" | "style" | "nav" | "iframe")
        || el.value().classes().any(|c| NOISE_CLASSES.contains(&c))
}

/// True when `el` sits below a noise element within `container`.
fn under_noise(el: &ElementRef<'_>, container: &ElementRef<'_>) -> bool {
    let mut node = el.parent();
    while let Some(n) = node {
        if n.id() == container.id() {
            break;
        }
        if let Some(parent_el) = ElementRef::wrap(n) {
            if is_noise(&parent_el) {
                return true;
            }
        }
        node = n.parent();
    }
    false
}

/// Extract the cleaned narrative body of a chapter page, or `None` when no
/// known container yields narrative blocks.
///
/// Within the first matching container, leaf `p`/`div` blocks are kept when
/// their noise-excluded text exceeds [MIN_BLOCK_CHARS] and survives the spam
/// classifier; surviving blocks are joined with blank lines and passed
/// through [clean_chapter_body].
pub fn extract_chapter(doc: &Html) -> Option<String> {
    let block_sel = Selector::parse("p, div").expect("block selector");

    for sel in CONTENT_SELECTORS {
        let sel = Selector::parse(sel).expect("content selector");
        let Some(container) = doc.select(&sel).next() else {
            continue;
        };

        let mut blocks: Vec<String> = Vec::new();
        for el in container.select(&block_sel) {
            if is_noise(&el) || under_noise(&el, &container) {
                continue;
            }
            // Leaf blocks only; a wrapper div would duplicate its children.
            if el.select(&block_sel).next().is_some() {
                continue;
            }
            let text = block_text(el, &is_noise);
            if text.chars().count() > MIN_BLOCK_CHARS && !is_spam_block(&text) {
                blocks.push(text);
            }
        }

        if !blocks.is_empty() {
            return Some(clean_chapter_body(&blocks.join("\n\n")));
        }
    }

    None
}
