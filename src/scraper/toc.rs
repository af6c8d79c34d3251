//! Chapter discovery: enumerate chapter links from a novel index page,
//! assign ordinals, deduplicate, and sort.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::model::ChapterLink;

/// Known chapter-list containers, in preference order. WordPress themes on
/// the source site have used all three.
const CHAPTER_LIST_SELECTOR: &str = "ul.lcp_catlist a, .chapter-list a, .wp-manga-chapter a";

static CHAPTER_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/capitulo-?\d+").expect("chapter href pattern"));
static NUMBER_FROM_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)capitulo-?(\d+)").expect("url ordinal pattern"));
static NUMBER_FROM_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)cap[íi]tulo\s*(\d+)").expect("title ordinal pattern"));
static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("number pattern"));

/// Enumerate chapter links from the index page.
///
/// Tries the known list containers first, then falls back to scanning every
/// anchor whose href looks like a chapter locator. Results are deduplicated
/// by locator and sorted ascending by ordinal; ordinal 0 (unparseable) sorts
/// first as a visible extraction-failure signal.
pub fn discover_chapters(doc: &Html, base_url: &str) -> Vec<ChapterLink> {
    let list_sel = Selector::parse(CHAPTER_LIST_SELECTOR).expect("chapter list selector");
    let any_anchor = Selector::parse("a").expect("anchor selector");

    let mut anchors: Vec<(String, String)> = doc
        .select(&list_sel)
        .filter_map(|a| {
            a.value()
                .attr("href")
                .map(|href| (href.to_string(), a.text().collect::<String>().trim().to_string()))
        })
        .collect();

    if anchors.is_empty() {
        anchors = doc
            .select(&any_anchor)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                if !CHAPTER_HREF.is_match(href) {
                    return None;
                }
                Some((href.to_string(), a.text().collect::<String>().trim().to_string()))
            })
            .collect();
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut chapters: Vec<ChapterLink> = Vec::new();
    for (href, title) in anchors {
        if !href.to_lowercase().contains("capitulo") {
            continue;
        }
        let url = if href.starts_with("http") {
            href.clone()
        } else {
            format!("{}{}", base_url, href)
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        let number = chapter_number(&href, &title);
        chapters.push(ChapterLink { url, title, number });
    }

    chapters.sort_by_key(|c| c.number);
    chapters
}

/// Ordinal for one chapter link: locator first, then the title's
/// `Capítulo N`, then any digit run in the title, else 0.
pub fn chapter_number(url: &str, title: &str) -> u32 {
    if let Some(caps) = NUMBER_FROM_URL.captures(url) {
        if let Ok(n) = caps[1].parse() {
            return n;
        }
    }
    if let Some(caps) = NUMBER_FROM_TITLE.captures(title) {
        if let Ok(n) = caps[1].parse() {
            return n;
        }
    }
    if let Some(caps) = FIRST_NUMBER.captures(title) {
        if let Ok(n) = caps[1].parse() {
            return n;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://novelasligera.com";

    #[test]
    fn discovery_sorts_by_ordinal() {
        let html = Html::parse_document(
            r#"<ul class="lcp_catlist">
                 <li><a href="https://novelasligera.com/novela-capitulo-3/">Capítulo 3</a></li>
                 <li><a href="https://novelasligera.com/novela-capitulo-1/">Capítulo 1</a></li>
                 <li><a href="https://novelasligera.com/novela-capitulo-2/">Capítulo 2</a></li>
               </ul>"#,
        );
        let chapters = discover_chapters(&html, BASE);
        let numbers: Vec<u32> = chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(chapters[0].url.ends_with("capitulo-1/"));
        assert!(chapters[2].url.ends_with("capitulo-3/"));
    }

    #[test]
    fn discovery_falls_back_to_href_scan() {
        let html = Html::parse_document(
            r#"<div>
                 <a href="/inicio">Inicio</a>
                 <a href="/novela/alguna/capitulo-2/">Capítulo 2</a>
                 <a href="/novela/alguna/capitulo-1/">Capítulo 1</a>
               </div>"#,
        );
        let chapters = discover_chapters(&html, BASE);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].number, 1);
        assert_eq!(chapters[0].url, "https://novelasligera.com/novela/alguna/capitulo-1/");
    }

    #[test]
    fn discovery_deduplicates_by_locator() {
        let html = Html::parse_document(
            r#"<ul class="lcp_catlist">
                 <li><a href="/novela-capitulo-1/">Capítulo 1</a></li>
                 <li><a href="/novela-capitulo-1/">Capítulo 1 (repetido)</a></li>
               </ul>"#,
        );
        let chapters = discover_chapters(&html, BASE);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Capítulo 1");
    }

    #[test]
    fn discovery_keeps_unnumbered_entries_first() {
        let html = Html::parse_document(
            r#"<ul class="lcp_catlist">
                 <li><a href="/novela-capitulo-5/">Capítulo 5</a></li>
                 <li><a href="/novela-capitulo-extra/">Especial</a></li>
               </ul>"#,
        );
        let chapters = discover_chapters(&html, BASE);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].number, 0);
        assert_eq!(chapters[1].number, 5);
    }

    #[test]
    fn discovery_ignores_non_chapter_links_in_list() {
        let html = Html::parse_document(
            r#"<ul class="lcp_catlist">
                 <li><a href="/otra-pagina/">Otra cosa</a></li>
                 <li><a href="/novela-capitulo-1/">Capítulo 1</a></li>
               </ul>"#,
        );
        let chapters = discover_chapters(&html, BASE);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].number, 1);
    }

    #[test]
    fn number_from_url_beats_title() {
        assert_eq!(chapter_number("/novela-capitulo-12/", "Capítulo 99"), 12);
    }

    #[test]
    fn number_from_title_variants() {
        assert_eq!(chapter_number("/sin-numero/", "Capítulo 7"), 7);
        assert_eq!(chapter_number("/sin-numero/", "capitulo 8 – el regreso"), 8);
        assert_eq!(chapter_number("/sin-numero/", "TVWL 15"), 15);
        assert_eq!(chapter_number("/sin-numero/", "epílogo"), 0);
    }
}
