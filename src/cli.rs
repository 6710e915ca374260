//! Command-line interface definitions for News Relay.
//!
//! Global flags override the YAML configuration; each subcommand maps onto one
//! [`NewsService`](crate::pipeline::NewsService) operation.

use crate::config::NewsConfig;
use crate::models::{NewsRequest, RequestKind, ResponseFormat, SortKey};
use crate::taxonomy::{Category, CountryCode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Relay application.
///
/// # Examples
///
/// ```sh
/// # Taiwanese business headlines as JSON
/// news_relay --representative-country TW get --kind topics --country TW --category business
///
/// # Binary search reply, newest first, decoded for inspection
/// news_relay get --kind search --country US --query taiwan --when 7d \
///     --sort publishedAt --format binary --decode
///
/// # Refresh every edition and log one push per topic
/// news_relay -c news.yaml update --notify
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Edition whose home menu defines the category paths
    #[arg(long, env = "NEWS_RELAY_REPRESENTATIVE_COUNTRY", global = true)]
    pub representative_country: Option<CountryCode>,

    /// Lifetime of cached replies, in seconds
    #[arg(long, global = true)]
    pub cache_ttl_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve one request and print the reply
    Get(GetArgs),

    /// Refetch every topic listing and print the report
    Update {
        /// Limit the refresh to one edition
        #[arg(long)]
        country: Option<CountryCode>,

        /// Push one cached headline per topic through the log sink
        #[arg(long)]
        notify: bool,
    },

    /// Discover topic paths and print them
    Paths,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(long, default_value = "topics")]
    pub kind: RequestKind,

    #[arg(long)]
    pub country: CountryCode,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(short, long)]
    pub query: Option<String>,

    /// Search recency window, e.g. `1d` or `7d`
    #[arg(long)]
    pub when: Option<String>,

    #[arg(long, default_value = "none")]
    pub sort: SortKey,

    #[arg(long, default_value = "structured")]
    pub format: ResponseFormat,

    /// Also print the articles inside a binary reply
    #[arg(long)]
    pub decode: bool,

    /// Write the reply here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl GetArgs {
    pub fn to_request(&self) -> NewsRequest {
        NewsRequest {
            kind: self.kind,
            country: self.country,
            category: self.category,
            query: self.query.clone(),
            time_window: self.when.clone(),
            sort: self.sort,
            format: self.format,
        }
    }
}

impl Cli {
    /// Fold the global flags into `config`.
    pub fn apply_overrides(&self, config: &mut NewsConfig) {
        if let Some(country) = self.representative_country {
            config.representative_country = Some(country);
        }
        if let Some(ttl) = self.cache_ttl_secs {
            config.cache_ttl_secs = ttl;
        }
    }
}
