//! Request URL construction.
//!
//! # URL Patterns
//!
//! ```text
//! search: {root}/search?q=taiwan%20when%3A1d&hl=zh-TW&gl=TW&ceid=TW:zh-Hant
//! topics: {root}/topics/CAAqJggKIiBDQkFT...?hl=zh-TW&gl=TW&ceid=TW:zh-Hant
//! ```
//!
//! `{root}` is the site base for rendered pages and the RSS base for feeds.

use crate::error::BuildError;
use crate::models::RequestKind;
use crate::taxonomy::{Category, CountryCode};
use crate::topics::TaxonomyMaps;
use url::Url;

/// Everything [`UrlBuilder::build`] needs from a request.
#[derive(Debug, Clone, Copy)]
pub struct BuildParams<'a> {
    pub kind: RequestKind,
    pub country: CountryCode,
    pub category: Option<Category>,
    pub query: Option<&'a str>,
    pub time_window: Option<&'a str>,
    pub wants_feed: bool,
}

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    site_base: String,
    feed_base: String,
}

impl UrlBuilder {
    pub fn new(site_base: impl Into<String>, feed_base: impl Into<String>) -> Self {
        Self {
            site_base: site_base.into().trim_end_matches('/').to_string(),
            feed_base: feed_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the listing URL for one request.
    ///
    /// Feed requests are rooted at the feed base, everything else at the site
    /// base. Search appends ` when:<window>` to the query before encoding it;
    /// topics use the country's region path for [`Category::General`].
    ///
    /// # Arguments
    ///
    /// * `maps` - Topic and region paths discovered so far
    /// * `params` - Request kind, edition, category or query, and root choice
    ///
    /// # Returns
    ///
    /// The absolute URL, or a [`BuildError`] when the query or category is
    /// missing, the needed path has not been discovered, or the kind has no
    /// listing URL. Never touches the network.
    pub fn build(&self, maps: &TaxonomyMaps, params: &BuildParams<'_>) -> Result<Url, BuildError> {
        let root = if params.wants_feed {
            &self.feed_base
        } else {
            &self.site_base
        };
        let locale = params.country.locale_query();

        let raw = match params.kind {
            RequestKind::Search => {
                let query = params
                    .query
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .ok_or(BuildError::MissingQuery)?;
                let q = match params.time_window.map(str::trim).filter(|w| !w.is_empty()) {
                    Some(window) => format!("{query} when:{window}"),
                    None => query.to_string(),
                };
                let mut url = format!(
                    "{root}{}?q={}",
                    RequestKind::Search.prefix_path(),
                    urlencoding::encode(&q)
                );
                if !locale.is_empty() {
                    url.push('&');
                    url.push_str(&locale);
                }
                url
            }
            RequestKind::Topics => {
                let category = params.category.ok_or(BuildError::MissingCategory)?;
                let path = if category == Category::General {
                    maps.region_path(params.country)
                        .ok_or(BuildError::MissingRegionPath(params.country))?
                } else {
                    maps.topic_path(category)
                        .ok_or(BuildError::MissingTopicPath(category))?
                };
                let mut url = format!("{root}{}{path}", RequestKind::Topics.prefix_path());
                if !locale.is_empty() {
                    url.push('?');
                    url.push_str(&locale);
                }
                url
            }
            RequestKind::Article => return Err(BuildError::UnsupportedKind(RequestKind::Article)),
        };

        Ok(Url::parse(&raw)?)
    }
}
