//! HTTP GET abstraction used by bootstrap and request handling.
//!
//! The pipeline only needs "send a GET, get back a status and a body", so
//! that is all the [`Fetch`] trait exposes. [`HttpFetcher`] implements it on
//! top of `reqwest`; tests substitute a static fake.
//!
//! Nothing here retries. One attempt per operation is the contract and any
//! retry policy belongs to the caller.

use crate::error::{FetchError, NewsError};
use crate::utils::truncate_for_log;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Raw result of one GET.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing a single HTTP GET.
///
/// Implementors report transport failures as [`FetchError::Transport`];
/// non-success statuses are returned as a normal [`FetchResponse`] and
/// judged by [`fetch_document`].
pub trait Fetch {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// `reqwest`-backed [`Fetch`] implementation.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let t0 = Instant::now();
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;

        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET completed"
        );
        Ok(FetchResponse { status, body })
    }
}

/// Fetch `url` and insist on a 2xx status and a non-blank body.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_document<F: Fetch>(fetcher: &F, url: &str) -> Result<String, NewsError> {
    let response = fetcher.get(url).await?;
    if !response.is_success() {
        warn!(
            status = response.status,
            body_preview = %truncate_for_log(&response.body, 200),
            "Upstream returned non-success status"
        );
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        }
        .into());
    }
    if response.body.trim().is_empty() {
        return Err(NewsError::malformed(url, "empty body"));
    }
    Ok(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;

    #[tokio::test]
    async fn test_fetch_document_accepts_success() {
        let fetcher = StaticFetcher::new().with_page("https://a.test/", 200, "<html></html>");
        let body = fetch_document(&fetcher, "https://a.test/").await.unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn test_fetch_document_rejects_status() {
        let fetcher = StaticFetcher::new().with_page("https://a.test/", 503, "busy");
        let err = fetch_document(&fetcher, "https://a.test/").await.unwrap_err();
        assert!(matches!(
            err,
            NewsError::UpstreamUnreachable(FetchError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_document_rejects_blank_body() {
        let fetcher = StaticFetcher::new().with_page("https://a.test/", 200, "  \n ");
        let err = fetch_document(&fetcher, "https://a.test/").await.unwrap_err();
        assert!(matches!(err, NewsError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn test_fetch_document_reports_transport_failure() {
        let fetcher = StaticFetcher::new();
        let err = fetch_document(&fetcher, "https://unknown.test/").await.unwrap_err();
        assert!(matches!(
            err,
            NewsError::UpstreamUnreachable(FetchError::Transport { .. })
        ));
    }
}
