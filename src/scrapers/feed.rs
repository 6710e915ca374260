//! RSS feed scraper.
//!
//! Feed items carry cleaner data than rendered pages: a real publication
//! timestamp and the publisher in a `<source>` element. Titles arrive as
//! `"<headline> - <publisher>"`, so the trailing publisher segment is cut.

use crate::models::{Article, PUBLISHED_AT_FORMAT, Source};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    source: Option<FeedSource>,
}

#[derive(Debug, Deserialize)]
struct FeedSource {
    #[serde(rename = "@url", default)]
    url: Option<String>,
    #[serde(rename = "$text", default)]
    name: String,
}

/// Parse an RSS document, stamping undated items with the current time.
pub fn parse_feed(document_body: &str) -> Result<Vec<Article>, quick_xml::DeError> {
    parse_feed_at(document_body, Utc::now())
}

/// Parse an RSS document; `now` stands in for unparseable `pubDate`s.
#[instrument(level = "info", skip_all, fields(bytes = document_body.len()))]
pub fn parse_feed_at(
    document_body: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Article>, quick_xml::DeError> {
    let rss: Rss = quick_xml::de::from_str(document_body)?;

    let articles: Vec<Article> = rss
        .channel
        .items
        .into_iter()
        .map(|item| {
            let publisher = item
                .source
                .as_ref()
                .map(|s| s.name.trim().to_string())
                .unwrap_or_default();
            Article {
                source: Source {
                    id: item.source.and_then(|s| s.url),
                    name: publisher.clone(),
                },
                author: publisher,
                title: strip_publisher_suffix(&item.title),
                description: None,
                url: item.link.trim().to_string(),
                url_to_image: None,
                published_at: canonical_date(item.pub_date.as_deref(), now),
                content: None,
            }
        })
        .collect();

    debug!(count = articles.len(), "Parsed feed listing");
    Ok(articles)
}

/// `"Headline - Publisher"` → `"Headline"`; titles without the separator are kept.
pub fn strip_publisher_suffix(title: &str) -> String {
    let title = title.trim();
    match title.rsplit_once(" - ") {
        Some((headline, _publisher)) => headline.trim_end().to_string(),
        None => title.to_string(),
    }
}

/// RFC 2822 `pubDate` → `YYYY-MM-DD HH:MM` in UTC.
fn canonical_date(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let parsed = raw.and_then(|raw| match DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(%raw, error = %e, "Unparseable pubDate; using current time");
            None
        }
    });
    parsed
        .unwrap_or(now)
        .format(PUBLISHED_AT_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <generator>NFE/5.0</generator>
    <title>Top stories - Google News</title>
    <link>https://news.google.com/?hl=en-US&amp;gl=US&amp;ceid=US:en</link>
    <language>en-US</language>
    <lastBuildDate>Mon, 01 Jan 2024 10:00:00 GMT</lastBuildDate>
    <description>Google News</description>
    <item>
      <title>Taiwan eyes new policy - Example News</title>
      <link>https://news.google.com/rss/articles/ONE?oc=5</link>
      <guid isPermaLink="false">ONE</guid>
      <pubDate>Mon, 01 Jan 2024 09:00:00 GMT</pubDate>
      <description>&lt;a href="https://news.google.com/rss/articles/ONE"&gt;Taiwan eyes new policy&lt;/a&gt;</description>
      <source url="https://example.com">Example News</source>
    </item>
    <item>
      <title>Markets - rally - continues - Wire &amp; Co</title>
      <link>https://news.google.com/rss/articles/TWO?oc=5</link>
      <pubDate>Fri, 01 Mar 2024 17:30:00 +0800</pubDate>
      <source url="https://wire.example">Wire &amp; Co</source>
    </item>
    <item>
      <title>No publisher suffix</title>
      <link>https://news.google.com/rss/articles/THREE</link>
      <pubDate>yesterday-ish</pubDate>
    </item>
  </channel>
</rss>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_feed_items() {
        let articles = parse_feed_at(FEED, now()).unwrap();
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.title, "Taiwan eyes new policy");
        assert_eq!(first.url, "https://news.google.com/rss/articles/ONE?oc=5");
        assert_eq!(first.published_at, "2024-01-01 09:00");
        assert_eq!(first.author, "Example News");
        assert_eq!(first.source.name, "Example News");
        assert_eq!(first.source.id.as_deref(), Some("https://example.com"));
        assert!(first.url_to_image.is_none());
        assert!(first.description.is_none());
    }

    #[test]
    fn test_only_last_suffix_is_dropped_and_offsets_normalized() {
        let articles = parse_feed_at(FEED, now()).unwrap();
        assert_eq!(articles[1].title, "Markets - rally - continues");
        assert_eq!(articles[1].author, "Wire & Co");
        assert_eq!(articles[1].published_at, "2024-03-01 09:30");
    }

    #[test]
    fn test_unparseable_date_falls_back_to_now() {
        let articles = parse_feed_at(FEED, now()).unwrap();
        assert_eq!(articles[2].title, "No publisher suffix");
        assert_eq!(articles[2].published_at, "2024-06-01 12:00");
        assert_eq!(articles[2].author, "");
        assert!(articles[2].source.id.is_none());
    }

    #[test]
    fn test_strip_publisher_suffix() {
        assert_eq!(
            strip_publisher_suffix("Taiwan eyes new policy - Example News"),
            "Taiwan eyes new policy"
        );
        assert_eq!(strip_publisher_suffix("Plain-title"), "Plain-title");
    }

    #[test]
    fn test_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        assert!(parse_feed_at(xml, now()).unwrap().is_empty());
    }

    #[test]
    fn test_non_feed_document_is_rejected() {
        assert!(parse_feed_at("<html><body>nope</body></html>", now()).is_err());
        assert!(parse_feed_at("", now()).is_err());
    }
}
