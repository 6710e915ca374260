//! Request handling and bulk refresh.
//!
//! [`NewsService`] ties the pieces together:
//!
//! 1. **Key**: derive the [`CacheKey`] and serve a hit straight from the cache
//! 2. **Locate**: build the listing URL, bootstrapping topic paths when the
//!    one this request needs is missing
//! 3. **Fetch**: one GET, no retry
//! 4. **Parse**: feed scraper for binary replies, markup scraper otherwise
//! 5. **Sort**: binary search replies only
//! 6. **Store**: encode, cache under the key, and cache the headline
//!    projection for topic listings
//!
//! Failures never escape [`NewsService::handle`]; they become a negative
//! reply. [`NewsService::refresh`] fans out one task per (country, category)
//! and reports each task's outcome.

use crate::cache::{Cache, CacheKey, CachedValue};
use crate::codec;
use crate::config::{ConfigError, NewsConfig};
use crate::error::{BuildError, NewsError};
use crate::fetch::{Fetch, fetch_document};
use crate::models::{
    Article, Headline, NewsReply, NewsRequest, NewsResponse, RequestKind, ResponseFormat,
};
use crate::notify::{self, PushMessage, PushSink};
use crate::scrapers::{feed, markup};
use crate::sort::sort_articles;
use crate::taxonomy::{Category, CountryCode};
use crate::topics::TopicPathResolver;
use crate::urls::{BuildParams, UrlBuilder};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use rand::Rng;
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Whether a fetch may trigger topic discovery when its path is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discovery {
    OnMissingPath,
    Never,
}

#[derive(Debug)]
pub struct NewsService<F> {
    fetcher: Arc<F>,
    resolver: TopicPathResolver<F>,
    urls: UrlBuilder,
    cache: Cache,
    site_base: Url,
    refresh_concurrency: usize,
}

impl<F: Fetch> NewsService<F> {
    /// Wire a service from validated configuration.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - HTTP seam shared by discovery and listing fetches
    /// * `config` - Settings; rejected when [`NewsConfig::validate`] fails
    pub fn from_config(fetcher: Arc<F>, config: &NewsConfig) -> Result<Self, ConfigError> {
        let representative = config.validate()?;
        let site_base = Url::parse(&config.site_base_url)
            .map_err(|e| ConfigError::Invalid(format!("site_base_url: {e}")))?;
        Ok(Self {
            resolver: TopicPathResolver::new(
                Arc::clone(&fetcher),
                config.bootstrap_settings(representative),
            ),
            fetcher,
            urls: UrlBuilder::new(&config.site_base_url, &config.feed_base_url),
            cache: Cache::new(config.cache_ttl()),
            site_base,
            refresh_concurrency: config.refresh_concurrency,
        })
    }

    pub fn resolver(&self) -> &TopicPathResolver<F> {
        &self.resolver
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Serve a request; every failure becomes a negative reply.
    #[instrument(level = "info", skip_all, fields(kind = request.kind.as_str(), country = %request.country))]
    pub async fn handle(&self, request: &NewsRequest) -> NewsReply {
        match self.try_handle(request).await {
            Ok(reply) => reply,
            Err(e) => {
                match &e {
                    NewsError::MissingTaxonomy(_) | NewsError::InvalidRequest(_) => {
                        warn!(error = %e, "Rejected request")
                    }
                    _ => error!(error = %e, "Request failed"),
                }
                NewsReply::negative(request.format)
            }
        }
    }

    /// Serve a request, surfacing the failure instead of a negative reply.
    ///
    /// A cached entry of the requested shape is returned without any network
    /// traffic. On a miss the listing is fetched and parsed, binary search
    /// results are sorted, and the result is cached under the request's key.
    /// Topic listings also refresh their headline projection.
    ///
    /// # Arguments
    ///
    /// * `request` - Kind, edition, category or query, sort and reply format
    ///
    /// # Returns
    ///
    /// The reply in the requested format, or the [`NewsError`] that stopped
    /// it. Nothing is cached on failure.
    pub async fn try_handle(&self, request: &NewsRequest) -> Result<NewsReply, NewsError> {
        let key = match CacheKey::for_request(request) {
            Some(key) => key,
            None if request.kind == RequestKind::Topics => {
                return Err(BuildError::MissingCategory.into());
            }
            None => return Err(BuildError::UnsupportedKind(request.kind).into()),
        };

        if let Some(value) = self.cache.get(&key) {
            if let Some(reply) = reply_from_cache(request.format, value) {
                debug!(%key, "Cache hit");
                return Ok(reply);
            }
            warn!(%key, "Cached value has the wrong shape; refetching");
        }

        let articles = self.fetch_articles(request, Discovery::OnMissingPath).await?;
        self.store(request, key, articles)
    }

    /// Cached headline projection for one topic.
    pub fn headlines(&self, country: CountryCode, category: Category) -> NewsResponse<Vec<Headline>> {
        match self.cache.get(&CacheKey::notification(country, category)) {
            Some(CachedValue::Headlines(headlines)) => {
                NewsResponse::ok(headlines.len(), headlines.to_vec())
            }
            _ => NewsResponse::negative(),
        }
    }

    /// Refetch every topic listing for one country, or for all of them.
    ///
    /// Cache reads are bypassed. Binary topic entries and headline
    /// projections are rewritten for each pair that succeeds.
    ///
    /// # Arguments
    ///
    /// * `country` - One edition, or `None` for every known edition
    ///
    /// # Returns
    ///
    /// A [`RefreshReport`] listing each pair as refreshed (with its article
    /// count) or failed (with its error), sorted by country then category.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh(&self, country: Option<CountryCode>) -> RefreshReport {
        let t0 = Instant::now();
        let countries: Vec<CountryCode> = match country {
            Some(country) => vec![country],
            None => CountryCode::KNOWN.to_vec(),
        };

        if let Err(e) = self.resolver.ensure_bootstrapped().await {
            warn!(error = %e, "Topic discovery incomplete; refreshing with the paths available");
        }

        let purged = self.cache.purge_expired();
        debug!(purged, "Purged expired cache entries");

        let mut outcomes: Vec<(CountryCode, Category, Result<usize, NewsError>)> =
            stream::iter(countries.into_iter().cartesian_product(Category::ALL))
                .map(|(country, category)| async move {
                    let result = self.refresh_topic(country, category).await;
                    (country, category, result)
                })
                .buffer_unordered(self.refresh_concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(country, category, _)| (*country, *category));

        let mut report = RefreshReport::default();
        for (country, category, result) in outcomes {
            match result {
                Ok(articles) => report.refreshed.push(RefreshedTopic {
                    country,
                    category,
                    articles,
                }),
                Err(error) => {
                    warn!(%country, %category, error = %error, "Topic refresh failed");
                    report.failed.push(RefreshFailure {
                        country,
                        category,
                        error,
                    });
                }
            }
        }

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Refresh complete"
        );
        report
    }

    /// Push one random cached headline per (country, category) through `sink`.
    #[instrument(level = "info", skip(self, sink, rng))]
    pub async fn notify<S: PushSink, R: Rng>(
        &self,
        country: Option<CountryCode>,
        sink: &S,
        rng: &mut R,
    ) -> NotifyReport {
        let countries: Vec<CountryCode> = match country {
            Some(country) => vec![country],
            None => CountryCode::KNOWN.to_vec(),
        };

        let mut report = NotifyReport::default();
        for (country, category) in countries.into_iter().cartesian_product(Category::ALL) {
            let projection = self.headlines(country, category);
            let Some(headline) = notify::pick(&projection.articles, rng) else {
                report.skipped += 1;
                continue;
            };
            let message = PushMessage::new(country, category, headline);
            match sink.push(&message).await {
                Ok(()) => report.delivered.push(message),
                Err(e) => {
                    warn!(error = %e, "Push failed");
                    report.failed.push(message);
                }
            }
        }

        info!(
            delivered = report.delivered.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "Notification run complete"
        );
        report
    }

    async fn refresh_topic(&self, country: CountryCode, category: Category) -> Result<usize, NewsError> {
        let request = NewsRequest::topics(country, category, ResponseFormat::Binary);
        let key = CacheKey::topic(ResponseFormat::Binary, country, category);
        let articles = self.fetch_articles(&request, Discovery::Never).await?;
        let count = articles.len();
        self.store(&request, key, articles)?;
        Ok(count)
    }

    async fn fetch_articles(
        &self,
        request: &NewsRequest,
        discovery: Discovery,
    ) -> Result<Vec<Article>, NewsError> {
        let wants_feed = request.format == ResponseFormat::Binary;
        let params = BuildParams {
            kind: request.kind,
            country: request.country,
            category: request.category,
            query: request.query.as_deref(),
            time_window: request.time_window.as_deref(),
            wants_feed,
        };

        let url = match self.urls.build(&self.resolver.snapshot(), &params) {
            Err(e) if e.is_missing_taxonomy() && discovery == Discovery::OnMissingPath => {
                if let Err(bootstrap) = self.resolver.ensure_bootstrapped().await {
                    warn!(error = %bootstrap, "Topic discovery incomplete; using partial paths");
                }
                self.urls.build(&self.resolver.snapshot(), &params)?
            }
            built => built?,
        };

        let body = fetch_document(self.fetcher.as_ref(), url.as_str()).await?;
        let articles = if wants_feed {
            feed::parse_feed(&body).map_err(|e| NewsError::malformed(url.as_str(), e.to_string()))?
        } else {
            markup::parse(&body, &self.site_base)
        };

        let articles = if request.kind == RequestKind::Search && wants_feed {
            sort_articles(articles, request.sort)
        } else {
            articles
        };

        info!(%url, count = articles.len(), "Fetched listing");
        Ok(articles)
    }

    fn store(
        &self,
        request: &NewsRequest,
        key: CacheKey,
        articles: Vec<Article>,
    ) -> Result<NewsReply, NewsError> {
        if let (RequestKind::Topics, Some(category)) = (request.kind, request.category) {
            let projection = notify::project(&articles);
            self.cache.set_default(
                CacheKey::notification(request.country, category),
                CachedValue::Headlines(projection.into()),
            );
        }

        let total = articles.len();
        match request.format {
            ResponseFormat::Binary => {
                let bytes = codec::encode(&articles, total)?;
                self.cache.set_default(
                    key,
                    CachedValue::Encoded {
                        bytes: Arc::from(bytes.as_slice()),
                        total_results: total,
                    },
                );
                Ok(NewsReply::Binary(NewsResponse::ok(total, bytes)))
            }
            ResponseFormat::Structured => {
                let shared: Arc<[Article]> = articles.into();
                self.cache
                    .set_default(key, CachedValue::Articles(Arc::clone(&shared)));
                Ok(NewsReply::Structured(NewsResponse::ok(total, shared.to_vec())))
            }
        }
    }
}

fn reply_from_cache(format: ResponseFormat, value: CachedValue) -> Option<NewsReply> {
    match (format, value) {
        (ResponseFormat::Binary, CachedValue::Encoded { bytes, total_results }) => Some(
            NewsReply::Binary(NewsResponse::ok(total_results, bytes.to_vec())),
        ),
        (ResponseFormat::Structured, CachedValue::Articles(articles)) => Some(
            NewsReply::Structured(NewsResponse::ok(articles.len(), articles.to_vec())),
        ),
        _ => None,
    }
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Serialize)]
pub struct RefreshedTopic {
    pub country: CountryCode,
    pub category: Category,
    pub articles: usize,
}

#[derive(Debug, Serialize)]
pub struct RefreshFailure {
    pub country: CountryCode,
    pub category: Category,
    #[serde(serialize_with = "serialize_display")]
    pub error: NewsError,
}

/// Per-pair outcome of [`NewsService::refresh`].
#[derive(Debug, Default, Serialize)]
pub struct RefreshReport {
    pub refreshed: Vec<RefreshedTopic>,
    pub failed: Vec<RefreshFailure>,
}

#[derive(Debug, Default, Serialize)]
pub struct NotifyReport {
    pub delivered: Vec<PushMessage>,
    pub failed: Vec<PushMessage>,
    /// Pairs with no cached projection.
    pub skipped: usize,
}
