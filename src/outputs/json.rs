//! JSON output for replies, reports and topic maps.

use crate::codec;
use crate::models::{Article, NewsReply, NewsResponse};
use crate::taxonomy::{Category, CountryCode};
use crate::topics::TaxonomyMaps;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

/// Serialize `value` as pretty JSON to `out`, or to stdout when `out` is `None`.
///
/// Parent directories of `out` are created as needed.
#[instrument(level = "info", skip(value))]
pub async fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    let Some(path) = out else {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(json.as_bytes()).await?;
        stdout.flush().await?;
        return Ok(());
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }
    fs::write(path, json).await?;
    info!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Structured view of a reply: binary payloads are decoded, and an
/// undecodable payload reads as an empty list.
pub fn decoded_view(reply: &NewsReply) -> NewsResponse<Vec<Article>> {
    match reply {
        NewsReply::Structured(response) => response.clone(),
        NewsReply::Binary(response) => {
            let (articles, total_results) = codec::decode_or_empty(&response.articles);
            NewsResponse {
                status: response.status,
                total_results,
                articles,
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopicRow {
    pub category: Category,
    pub name: &'static str,
    pub order: u8,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionRow {
    pub country: CountryCode,
    pub name: &'static str,
    pub path: Option<String>,
}

/// Resolved topic paths, one row per category and edition.
#[derive(Debug, Serialize)]
pub struct PathsView {
    pub topics: Vec<TopicRow>,
    pub regions: Vec<RegionRow>,
}

/// Tabulate `maps` for display. Categories follow their display order;
/// unresolved entries show a `null` path.
pub fn paths_view(maps: &TaxonomyMaps) -> PathsView {
    let mut topics: Vec<TopicRow> = Category::ALL
        .into_iter()
        .map(|category| TopicRow {
            category,
            name: category.display_name(),
            order: category.display_order(),
            path: maps.topic_path(category).map(str::to_string),
        })
        .collect();
    topics.sort_by_key(|row| row.order);

    let regions = CountryCode::KNOWN
        .into_iter()
        .map(|country| RegionRow {
            country,
            name: country.display_name(),
            path: maps.region_path(country).map(str::to_string),
        })
        .collect();

    PathsView { topics, regions }
}
