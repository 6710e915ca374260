//! In-memory TTL cache and its key scheme.
//!
//! # Keys
//!
//! ```text
//! [bin+]topics+TW+business
//! topics+TW+business+notification
//! [bin+]search+TW+<pct(query)>+<pct(window)>[+publishedAt]
//! ```
//!
//! `bin+` marks the binary envelope. Free text is percent-encoded so a `+`
//! typed by a user can never line up with a separator, and it is not case
//! folded: `Taiwan` and `taiwan` are different keys. The notification
//! projection key is shared by both formats. The sort fragment only appears
//! on binary search keys, the only path that sorts.
//!
//! # Capacity
//!
//! Nothing is evicted except by expiry. Topic keys are bounded by
//! country × category, but search keys grow with every distinct query.

use crate::models::{Article, Headline, NewsRequest, RequestKind, ResponseFormat, SortKey};
use crate::taxonomy::{Category, CountryCode};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Just under the 20 minute upstream refresh cadence.
pub const DEFAULT_TTL: Duration = Duration::from_secs(1190);

/// Longest lifetime an entry can be given. Longer TTLs are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const BINARY_PREFIX: &str = "bin+";
const NOTIFICATION_SUFFIX: &str = "+notification";

/// Canonical cache key built from typed request fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn topic(format: ResponseFormat, country: CountryCode, category: Category) -> Self {
        CacheKey(format!(
            "{}{}+{}+{}",
            format_prefix(format),
            RequestKind::Topics.as_str(),
            country.code(),
            category.as_str()
        ))
    }

    pub fn notification(country: CountryCode, category: Category) -> Self {
        let CacheKey(base) = Self::topic(ResponseFormat::Structured, country, category);
        CacheKey(base + NOTIFICATION_SUFFIX)
    }

    pub fn search(
        format: ResponseFormat,
        country: CountryCode,
        query: &str,
        time_window: &str,
        sort: SortKey,
    ) -> Self {
        let mut key = format!(
            "{}{}+{}+{}+{}",
            format_prefix(format),
            RequestKind::Search.as_str(),
            country.code(),
            urlencoding::encode(query),
            urlencoding::encode(time_window)
        );
        if format == ResponseFormat::Binary {
            key.push('+');
            key.push_str(sort.as_str());
        }
        CacheKey(key)
    }

    /// Key for a request, or `None` for kinds that are never cached.
    pub fn for_request(request: &NewsRequest) -> Option<Self> {
        match request.kind {
            RequestKind::Topics => request
                .category
                .map(|category| Self::topic(request.format, request.country, category)),
            RequestKind::Search => Some(Self::search(
                request.format,
                request.country,
                request.query.as_deref().unwrap_or_default(),
                request.time_window.as_deref().unwrap_or_default(),
                request.sort,
            )),
            RequestKind::Article => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn format_prefix(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Binary => BINARY_PREFIX,
        ResponseFormat::Structured => "",
    }
}

/// Cached payloads. Shared immutably with every reader.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Encoded { bytes: Arc<[u8]>, total_results: usize },
    Articles(Arc<[Article]>),
    Headlines(Arc<[Headline]>),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

/// Key → value store with per-entry expiry.
#[derive(Debug)]
pub struct Cache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Cache {
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `default_ttl` - Lifetime used by [`set_default`](Self::set_default),
    ///   clamped to [`MAX_TTL`] on every write
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Look up `key` as of now.
    ///
    /// # Returns
    ///
    /// A shared copy of the stored value, or `None` when the key is absent or
    /// its entry has expired. An expired entry is removed by the lookup.
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.get_at(key, Instant::now())
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// # Arguments
    ///
    /// * `key` - Canonical key from one of the [`CacheKey`] builders
    /// * `value` - Payload shared with every later reader
    /// * `ttl` - Lifetime from now, clamped to [`MAX_TTL`]
    pub fn set(&self, key: CacheKey, value: CachedValue, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    /// [`set`](Self::set) with the cache's default TTL.
    pub fn set_default(&self, key: CacheKey, value: CachedValue) {
        self.set(key, value, self.default_ttl);
    }

    /// Lookup as of `now`; expired entries are dropped on the way out.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<CachedValue> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if now < entry.expires_at {
            return Some(entry.value.clone());
        }
        entries.remove(key);
        debug!(%key, "Cache entry expired");
        None
    }

    /// Store as of `now`, replacing any previous value under `key`.
    pub fn set_at(&self, key: CacheKey, value: CachedValue, ttl: Duration, now: Instant) {
        let ttl = if ttl > MAX_TTL {
            warn!(%key, ttl_secs = ttl.as_secs(), max_secs = MAX_TTL.as_secs(), "Clamping cache TTL");
            MAX_TTL
        } else {
            ttl
        };
        let Some(expires_at) = now.checked_add(ttl) else {
            warn!(%key, ttl_secs = ttl.as_secs(), "Cache expiry out of range; entry not stored");
            return;
        };

        let mut entries = self.lock();
        entries.insert(key, CacheEntry { value, expires_at });
        debug!(entries = entries.len(), ttl_secs = ttl.as_secs(), "Cache entry stored");
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headlines() -> CachedValue {
        CachedValue::Headlines(Arc::from(vec![Headline {
            title: "t".to_string(),
            url: "u".to_string(),
        }]))
    }

    #[test]
    fn test_entry_present_until_ttl_elapses() {
        let cache = Cache::default();
        let key = CacheKey::topic(ResponseFormat::Structured, CountryCode::TW, Category::Health);
        let ttl = Duration::from_secs(60);
        let eps = Duration::from_millis(1);
        let t0 = Instant::now();

        cache.set_at(key.clone(), headlines(), ttl, t0);

        assert!(cache.get_at(&key, t0 + ttl - eps).is_some());
        assert!(cache.get_at(&key, t0 + ttl + eps).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites_and_refreshes_expiry() {
        let cache = Cache::default();
        let key = CacheKey::notification(CountryCode::US, Category::Sports);
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);

        cache.set_at(key.clone(), headlines(), ttl, t0);
        cache.set_at(
            key.clone(),
            CachedValue::Articles(Arc::from(Vec::new())),
            ttl,
            t0 + Duration::from_secs(8),
        );

        match cache.get_at(&key, t0 + Duration::from_secs(15)) {
            Some(CachedValue::Articles(articles)) => assert!(articles.is_empty()),
            other => panic!("unexpected cache value: {other:?}"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_huge_ttl_is_clamped_instead_of_overflowing() {
        let cache = Cache::new(Duration::from_secs(u64::MAX));
        let key = CacheKey::topic(ResponseFormat::Binary, CountryCode::US, Category::Health);
        let t0 = Instant::now();

        cache.set_default(key.clone(), headlines());
        assert!(cache.get(&key).is_some());

        cache.set_at(key.clone(), headlines(), Duration::MAX, t0);
        assert!(cache.get_at(&key, t0 + MAX_TTL - Duration::from_secs(1)).is_some());
        assert!(cache.get_at(&key, t0 + MAX_TTL).is_none());
    }

    #[test]
    fn test_purge_expired() {
        let cache = Cache::default();
        let t0 = Instant::now();
        cache.set_at(
            CacheKey::topic(ResponseFormat::Binary, CountryCode::JP, Category::General),
            headlines(),
            Duration::from_secs(1),
            t0,
        );
        cache.set_at(
            CacheKey::topic(ResponseFormat::Binary, CountryCode::JP, Category::Business),
            headlines(),
            Duration::from_secs(100),
            t0,
        );
        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(5)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_topic_key_shapes() {
        assert_eq!(
            CacheKey::topic(ResponseFormat::Structured, CountryCode::TW, Category::Business).as_str(),
            "topics+TW+business"
        );
        assert_eq!(
            CacheKey::topic(ResponseFormat::Binary, CountryCode::TW, Category::Business).as_str(),
            "bin+topics+TW+business"
        );
        assert_eq!(
            CacheKey::notification(CountryCode::TW, Category::Business).as_str(),
            "topics+TW+business+notification"
        );
    }

    #[test]
    fn test_search_key_shapes() {
        assert_eq!(
            CacheKey::search(
                ResponseFormat::Structured,
                CountryCode::US,
                "taiwan chips",
                "1d",
                SortKey::PublishedAt
            )
            .as_str(),
            "search+US+taiwan%20chips+1d"
        );
        assert_eq!(
            CacheKey::search(
                ResponseFormat::Binary,
                CountryCode::None,
                "taiwan",
                "",
                SortKey::PublishedAt
            )
            .as_str(),
            "bin+search+none+taiwan++publishedAt"
        );
    }

    #[test]
    fn test_identical_requests_produce_identical_keys() {
        let a = NewsRequest::search(CountryCode::TW, "taiwan", ResponseFormat::Binary)
            .with_time_window("7d")
            .with_sort(SortKey::PublishedAt);
        let b = a.clone();
        assert_eq!(CacheKey::for_request(&a), CacheKey::for_request(&b));
    }

    #[test]
    fn test_query_case_is_not_normalized() {
        let upper = CacheKey::search(ResponseFormat::Structured, CountryCode::TW, "Taiwan", "", SortKey::None);
        let lower = CacheKey::search(ResponseFormat::Structured, CountryCode::TW, "taiwan", "", SortKey::None);
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_separator_in_user_text_cannot_collide() {
        let joined = CacheKey::search(ResponseFormat::Structured, CountryCode::TW, "a+b", "", SortKey::None);
        let split = CacheKey::search(ResponseFormat::Structured, CountryCode::TW, "a", "b+", SortKey::None);
        assert_ne!(joined, split);
    }

    #[test]
    fn test_distinct_parameters_give_distinct_keys() {
        let mut keys = std::collections::HashSet::new();
        for format in [ResponseFormat::Structured, ResponseFormat::Binary] {
            for country in CountryCode::KNOWN {
                for category in Category::ALL {
                    assert!(keys.insert(CacheKey::topic(format, country, category)));
                }
            }
        }
        for country in CountryCode::KNOWN {
            for category in Category::ALL {
                assert!(keys.insert(CacheKey::notification(country, category)));
            }
        }
        for sort in [SortKey::None, SortKey::PublishedAt] {
            assert!(keys.insert(CacheKey::search(
                ResponseFormat::Binary,
                CountryCode::TW,
                "taiwan",
                "1d",
                sort
            )));
        }
    }

    #[test]
    fn test_article_requests_are_not_cached() {
        let mut request = NewsRequest::search(CountryCode::TW, "x", ResponseFormat::Structured);
        request.kind = RequestKind::Article;
        assert!(CacheKey::for_request(&request).is_none());
    }
}
