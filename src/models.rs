//! Data models for scraped articles, requests and replies.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: one listing entry scraped from a topic or search page
//! - [`NewsRequest`]: the parameters of one inbound request
//! - [`NewsResponse`]: the `{status, totalResults, articles}` envelope
//! - [`Headline`]: the reduced `{title, url}` view used for push sampling
//!
//! JSON field names follow the NewsAPI-style shape clients already consume,
//! hence the camelCase renames.

use crate::taxonomy::{Category, CountryCode};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Canonical `publishedAt` layout produced by the feed scraper.
pub const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Publisher of an article.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Source {
    pub id: Option<String>,
    pub name: String,
}

/// A single article listing.
///
/// Two articles are the same story when their `url` matches; every other
/// field is presentation data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source: Source,
    pub author: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    /// Free-form for markup listings ("2 hours ago"), [`PUBLISHED_AT_FORMAT`] for feed items.
    pub published_at: String,
    pub content: Option<String>,
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Article {}

impl Hash for Article {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// The `{title, url}` projection handed to push delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub url: String,
}

/// Request kind, mirroring the site's URL prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Search,
    Topics,
    Article,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Search => "search",
            RequestKind::Topics => "topics",
            RequestKind::Article => "article",
        }
    }

    /// Path prefix on the source site.
    pub fn prefix_path(self) -> &'static str {
        match self {
            RequestKind::Search => "/search",
            RequestKind::Topics => "/topics",
            RequestKind::Article => "/article",
        }
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(RequestKind::Search),
            "topics" => Ok(RequestKind::Topics),
            "article" => Ok(RequestKind::Article),
            other => Err(format!("unknown request kind `{other}`")),
        }
    }
}

/// Ordering requested for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Relevancy,
    Popularity,
    PublishedAt,
    #[default]
    None,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Relevancy => "relevancy",
            SortKey::Popularity => "popularity",
            SortKey::PublishedAt => "publishedAt",
            SortKey::None => "none",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevancy" => Ok(SortKey::Relevancy),
            "popularity" => Ok(SortKey::Popularity),
            "publishedat" | "published-at" | "published_at" => Ok(SortKey::PublishedAt),
            "none" | "" => Ok(SortKey::None),
            other => Err(format!("unknown sort key `{other}`")),
        }
    }
}

/// Shape of the reply: decoded JSON articles or the binary envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Structured,
    Binary,
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(ResponseFormat::Structured),
            "binary" | "bin" => Ok(ResponseFormat::Binary),
            other => Err(format!("unknown response format `{other}`")),
        }
    }
}

/// Parameters of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub kind: RequestKind,
    pub country: CountryCode,
    pub category: Option<Category>,
    pub query: Option<String>,
    /// Search recency window such as `1d` or `7d`, appended as `when:<window>`.
    pub time_window: Option<String>,
    pub sort: SortKey,
    pub format: ResponseFormat,
}

impl NewsRequest {
    pub fn topics(country: CountryCode, category: Category, format: ResponseFormat) -> Self {
        Self {
            kind: RequestKind::Topics,
            country,
            category: Some(category),
            query: None,
            time_window: None,
            sort: SortKey::None,
            format,
        }
    }

    pub fn search(country: CountryCode, query: impl Into<String>, format: ResponseFormat) -> Self {
        Self {
            kind: RequestKind::Search,
            country,
            category: None,
            query: Some(query.into()),
            time_window: None,
            sort: SortKey::None,
            format,
        }
    }

    pub fn with_time_window(mut self, window: impl Into<String>) -> Self {
        self.time_window = Some(window.into());
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }
}

/// `"OK"` on success, `"N"` for every negative outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "N")]
    Negative,
}

/// Reply envelope shared by the structured, binary and headline views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse<T> {
    pub status: ResponseStatus,
    pub total_results: usize,
    pub articles: T,
}

impl<T: Default> NewsResponse<T> {
    pub fn ok(total_results: usize, articles: T) -> Self {
        Self {
            status: ResponseStatus::Ok,
            total_results,
            articles,
        }
    }

    pub fn negative() -> Self {
        Self {
            status: ResponseStatus::Negative,
            total_results: 0,
            articles: T::default(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

/// What the pipeline hands back for a [`NewsRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NewsReply {
    Structured(NewsResponse<Vec<Article>>),
    Binary(NewsResponse<Vec<u8>>),
}

impl NewsReply {
    pub fn negative(format: ResponseFormat) -> Self {
        match format {
            ResponseFormat::Structured => NewsReply::Structured(NewsResponse::negative()),
            ResponseFormat::Binary => NewsReply::Binary(NewsResponse::negative()),
        }
    }

    pub fn status(&self) -> ResponseStatus {
        match self {
            NewsReply::Structured(r) => r.status,
            NewsReply::Binary(r) => r.status,
        }
    }

    pub fn total_results(&self) -> usize {
        match self {
            NewsReply::Structured(r) => r.total_results,
            NewsReply::Binary(r) => r.total_results,
        }
    }
}
