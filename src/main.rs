//! # News Relay
//!
//! A caching relay in front of Google News. It discovers the site's topic
//! paths, scrapes topic and search listings for ten country editions, and
//! serves them either as NewsAPI-style JSON or as a compact binary envelope.
//!
//! ## Features
//!
//! - One-time, single-flight discovery of category and region topic paths
//! - Rendered-page scraping for structured replies, RSS parsing for binary ones
//! - Per-entry TTL cache keyed by format, country, category or query
//! - Bulk refresh of every (country, category) listing, 12 at a time by default
//! - Headline projections sampled for push notifications
//!
//! ## Usage
//!
//! ```sh
//! news_relay --representative-country TW get --kind topics --country TW --category business
//! news_relay -c news.yaml update --notify
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: read each edition's home menu into topic path maps
//! 2. **Fetching**: build the listing URL and GET it
//! 3. **Parsing**: markup or feed scraper, then optional sort
//! 4. **Caching**: encode, store with TTL, project headlines

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod codec;
mod config;
mod error;
mod fetch;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod scrapers;
mod sort;
mod taxonomy;
mod topics;
mod urls;
mod utils;

#[cfg(test)]
mod testing;

use cli::{Cli, Command};
use config::{NewsConfig, load_config};
use fetch::HttpFetcher;
use notify::LogPushSink;
use outputs::json;
use pipeline::NewsService;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_relay starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.command, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => load_config(path).await?,
        None => NewsConfig::default(),
    };
    args.apply_overrides(&mut config);

    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent, config.request_timeout())?);
    let service = match NewsService::from_config(fetcher, &config) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    match args.command {
        Command::Get(get) => {
            let request = get.to_request();
            let reply = service.handle(&request).await;
            info!(
                status = ?reply.status(),
                total = reply.total_results(),
                "Request served"
            );
            if get.decode {
                json::write_json(&json::decoded_view(&reply), get.out.as_deref()).await?;
            } else {
                json::write_json(&reply, get.out.as_deref()).await?;
            }
        }
        Command::Update { country, notify } => {
            let report = service.refresh(country).await;
            json::write_json(&report, None).await?;
            if notify {
                let mut rng = StdRng::from_os_rng();
                let pushed = service.notify(country, &LogPushSink, &mut rng).await;
                json::write_json(&pushed, None).await?;
            }
        }
        Command::Paths => {
            if let Err(e) = service.resolver().ensure_bootstrapped().await {
                error!(error = %e, "Topic discovery incomplete");
            }
            info!(lifecycle = ?service.resolver().lifecycle(), "Topic paths resolved");
            let view = json::paths_view(&service.resolver().snapshot());
            json::write_json(&view, None).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
