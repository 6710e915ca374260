//! Error types for the fetch → parse → cache → serialize pipeline.
//!
//! Each concern gets its own enum; [`NewsError`] is what a request or a
//! refresh task ultimately fails with, and it maps onto the four outcome
//! kinds callers care about (upstream, malformed document, missing taxonomy,
//! undecodable payload).

use crate::models::RequestKind;
use crate::taxonomy::{Category, CountryCode};
use thiserror::Error;

/// Failure to obtain a usable document from the source site.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Failure to turn request parameters into a URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no topic path resolved for category {0}")]
    MissingTopicPath(Category),

    #[error("no region path resolved for country {0}")]
    MissingRegionPath(CountryCode),

    #[error("a category is required for topic requests")]
    MissingCategory,

    #[error("a non-empty query is required for search requests")]
    MissingQuery,

    #[error("request kind `{}` is not supported", .0.as_str())]
    UnsupportedKind(RequestKind),

    #[error("built an invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BuildError {
    /// Whether the failure means the taxonomy lacks an entry for the request.
    pub fn is_missing_taxonomy(&self) -> bool {
        matches!(
            self,
            BuildError::MissingTopicPath(_)
                | BuildError::MissingRegionPath(_)
                | BuildError::MissingCategory
        )
    }
}

/// Failure to read the compact wire format.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Wire(#[from] bincode::error::DecodeError),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),

    #[error("total count {0} does not fit in memory")]
    TotalOverflow(u64),
}

/// Failure of the one-time topic path discovery.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("topic discovery failed for {}", summarize(.0))]
    Countries(Vec<(CountryCode, NewsError)>),

    #[error("representative country {0} yielded no category paths")]
    RepresentativeUnresolved(CountryCode),
}

fn summarize(failures: &[(CountryCode, NewsError)]) -> String {
    failures
        .iter()
        .map(|(country, e)| format!("{country}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of a failed request or refresh task.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] FetchError),

    #[error("malformed document from {url}: {reason}")]
    MalformedDocument { url: String, reason: String },

    #[error("missing taxonomy: {0}")]
    MissingTaxonomy(BuildError),

    #[error("invalid request: {0}")]
    InvalidRequest(BuildError),

    #[error("undecodable payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to encode articles: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

impl NewsError {
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        NewsError::MalformedDocument {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl From<BuildError> for NewsError {
    fn from(e: BuildError) -> Self {
        if e.is_missing_taxonomy() {
            NewsError::MissingTaxonomy(e)
        } else {
            NewsError::InvalidRequest(e)
        }
    }
}
