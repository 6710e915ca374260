//! Headline projection and push sampling.
//!
//! Every topic fetch also stores a `{title, url}` projection of its articles
//! under [`CacheKey::notification`](crate::cache::CacheKey::notification).
//! A push run later picks one headline per (country, category) uniformly at
//! random and hands it to a [`PushSink`]. Delivery transport lives behind
//! that trait; [`LogPushSink`] only records what would have been sent.

use crate::models::{Article, Headline};
use crate::taxonomy::{Category, CountryCode};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

/// Reduce articles to the fields push delivery needs, skipping untitled or unlinked ones.
pub fn project(articles: &[Article]) -> Vec<Headline> {
    articles
        .iter()
        .filter(|a| !a.title.is_empty() && !a.url.is_empty())
        .map(|a| Headline {
            title: a.title.clone(),
            url: a.url.clone(),
        })
        .collect()
}

/// Uniformly random choice, `None` for an empty projection.
pub fn pick<'a, R: Rng + ?Sized>(headlines: &'a [Headline], rng: &mut R) -> Option<&'a Headline> {
    headlines.choose(rng)
}

/// One push: the headline is the body, the url rides in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub topic: String,
    pub body: String,
    pub url: String,
}

impl PushMessage {
    pub fn new(country: CountryCode, category: Category, headline: &Headline) -> Self {
        Self {
            topic: format!("{}-{}", country.code(), category.as_str()),
            body: headline.title.clone(),
            url: headline.url.clone(),
        }
    }
}

#[derive(Debug, Error)]
#[error("push to {topic} failed: {reason}")]
pub struct PushError {
    pub topic: String,
    pub reason: String,
}

/// Delivery collaborator for push messages.
pub trait PushSink {
    async fn push(&self, message: &PushMessage) -> Result<(), PushError>;
}

/// Sink that logs each message instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPushSink;

impl PushSink for LogPushSink {
    #[instrument(level = "info", skip_all, fields(topic = %message.topic))]
    async fn push(&self, message: &PushMessage) -> Result<(), PushError> {
        info!(body = %message.body, url = %message.url, "Push message");
        Ok(())
    }
}
