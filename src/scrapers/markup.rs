//! Rendered-page scraper.
//!
//! Google News renders each listing entry as an `<article>` block. Fields are
//! pulled from the first matching descendant of each block:
//!
//! | Field | Source |
//! |-------|--------|
//! | title | first `a` with non-empty text |
//! | publishedAt | first `time` text, kept raw ("2 hours ago") |
//! | source name, author | first `[data-n-tid]` text |
//! | url | `href` of the first `[target]` element |
//! | image | `src` of the first `.Quavad` thumbnail |
//!
//! A missing element blanks that one field. The block is still emitted.

use crate::models::{Article, Source};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid listing selector")
}

static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time"));
static PROVENANCE: Lazy<Selector> = Lazy::new(|| selector("[data-n-tid]"));
static TARGET: Lazy<Selector> = Lazy::new(|| selector("[target]"));
static THUMBNAIL: Lazy<Selector> = Lazy::new(|| selector(".Quavad"));

/// Parse a rendered listing page into articles in document order.
///
/// `base_url` is the site root; `./` links and relative thumbnails are
/// resolved against it.
#[instrument(level = "info", skip_all, fields(base = %base_url, bytes = document_body.len()))]
pub fn parse(document_body: &str, base_url: &Url) -> Vec<Article> {
    let document = Html::parse_document(document_body);
    let articles: Vec<Article> = document
        .select(&ARTICLE)
        .filter(is_top_level)
        .map(|block| parse_block(block, base_url))
        .collect();

    debug!(count = articles.len(), "Parsed markup listing");
    articles
}

fn is_top_level(element: &ElementRef<'_>) -> bool {
    !element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "article")
}

fn parse_block(block: ElementRef<'_>, base_url: &Url) -> Article {
    let title = block
        .select(&LINK)
        .map(text_of)
        .find(|t| !t.is_empty())
        .unwrap_or_default();
    let published_at = block.select(&TIME).next().map(text_of).unwrap_or_default();
    let provenance = block
        .select(&PROVENANCE)
        .next()
        .map(text_of)
        .unwrap_or_default();
    let url = block
        .select(&TARGET)
        .next()
        .and_then(|e| e.value().attr("href"))
        .map(|href| resolve_link(href, base_url))
        .unwrap_or_default();
    let image = block
        .select(&THUMBNAIL)
        .next()
        .and_then(thumbnail_source)
        .map(|src| resolve_image(src, base_url))
        .unwrap_or_default();

    Article {
        source: Source {
            id: None,
            name: provenance.clone(),
        },
        author: provenance,
        title,
        description: None,
        url,
        url_to_image: Some(image),
        published_at,
        content: None,
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(element.text())
}

fn thumbnail_source<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    let attrs = element.value();
    attrs.attr("src").or_else(|| {
        attrs
            .attr("srcset")
            .and_then(|set| set.split(',').next())
            .and_then(|candidate| candidate.split_whitespace().next())
    })
}

/// Article links are `./read/...`; only that relative form is rewritten.
fn resolve_link(href: &str, base_url: &Url) -> String {
    if Url::parse(href).is_ok() || !href.starts_with("./") {
        return href.to_string();
    }
    base_url
        .join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

fn resolve_image(src: &str, base_url: &Url) -> String {
    if Url::parse(src).is_ok() {
        return src.to_string();
    }
    base_url
        .join(src)
        .map(String::from)
        .unwrap_or_else(|_| src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><main>
          <article>
            <figure><img class="Quavad" src="/api/attachments/thumb-1" alt=""></figure>
            <div>
              <a href="./read/ONE?hl=en-US" target="_blank" aria-hidden="true"></a>
              <a class="JtKRv" href="./read/ONE?hl=en-US">Taiwan  eyes
                 new policy</a>
            </div>
            <div><div data-n-tid="9"><span>Example News</span></div></div>
            <div><time datetime="2024-01-01T09:00:00Z">2 hours ago</time></div>
          </article>
          <article>
            <div>
              <a href="https://publisher.example/story" target="_blank">Second story</a>
            </div>
            <div data-n-tid="3">Other Wire</div>
            <time>Yesterday</time>
          </article>
          <article><span>nothing extractable</span></article>
        </main></body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://news.google.com/").unwrap()
    }

    #[test]
    fn test_parse_full_block() {
        let articles = parse(LISTING, &base());
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.title, "Taiwan eyes new policy");
        assert_eq!(first.url, "https://news.google.com/read/ONE?hl=en-US");
        assert_eq!(first.published_at, "2 hours ago");
        assert_eq!(first.source.name, "Example News");
        assert_eq!(first.author, "Example News");
        assert_eq!(
            first.url_to_image.as_deref(),
            Some("https://news.google.com/api/attachments/thumb-1")
        );
        assert!(first.description.is_none());
        assert!(first.content.is_none());
    }

    #[test]
    fn test_missing_thumbnail_degrades_to_empty() {
        let articles = parse(LISTING, &base());
        let second = &articles[1];
        assert_eq!(second.title, "Second story");
        assert_eq!(second.url, "https://publisher.example/story");
        assert_eq!(second.source.name, "Other Wire");
        assert_eq!(second.published_at, "Yesterday");
        assert_eq!(second.url_to_image.as_deref(), Some(""));
    }

    #[test]
    fn test_empty_block_still_emitted() {
        let articles = parse(LISTING, &base());
        let third = &articles[2];
        assert_eq!(third.title, "");
        assert_eq!(third.url, "");
        assert_eq!(third.published_at, "");
        assert_eq!(third.author, "");
        assert_eq!(third.url_to_image.as_deref(), Some(""));
    }

    #[test]
    fn test_nested_articles_are_not_duplicated() {
        let html = r#"
            <article>
              <a href="./read/OUTER" target="_blank">Outer</a>
              <article><a href="./read/INNER" target="_blank">Inner</a></article>
            </article>"#;
        let articles = parse(html, &base());
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Outer");
    }

    #[test]
    fn test_srcset_and_protocol_relative_thumbnail() {
        let html = r#"
            <article>
              <img class="Quavad" srcset="//lh3.example.com/a=w100 1x, //lh3.example.com/a=w200 2x">
            </article>"#;
        let articles = parse(html, &base());
        assert_eq!(
            articles[0].url_to_image.as_deref(),
            Some("https://lh3.example.com/a=w100")
        );
    }

    #[test]
    fn test_resolve_link_leaves_other_relative_forms() {
        assert_eq!(resolve_link("/read/X", &base()), "/read/X");
        assert_eq!(
            resolve_link("./read/X", &base()),
            "https://news.google.com/read/X"
        );
    }

    #[test]
    fn test_no_articles() {
        assert!(parse("<html><body><p>empty</p></body></html>", &base()).is_empty());
    }
}
