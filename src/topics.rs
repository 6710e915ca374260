//! Topic path discovery.
//!
//! Google News addresses every topic listing by an opaque path segment
//! (`/topics/CAAqJggKIiBDQkFTRWdv...`). Those segments are not stable enough
//! to hardcode, so they are scraped from each edition's home page menu the
//! first time a topic URL is needed.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──ensure_bootstrapped()──▶ Bootstrapping ──ok──▶ Ready
//!        ▲                                       │
//!        └──────────────── error ────────────────┘
//! ```
//!
//! Discovery is single-flight: callers that arrive while an attempt is
//! running wait for it and share its outcome, failure included. Success is
//! latched for the life of the process. A failure leaves whatever partial
//! maps were written, and the next caller to arrive after it starts a fresh
//! attempt.
//!
//! # Category assignment
//!
//! Only the representative edition's menu feeds the [`Category`] map. Each
//! menu label is first looked up against the category label table; any
//! category still unassigned then takes the next unclaimed menu entry in
//! declared enumeration order. Every edition contributes its first real menu
//! entry as the region path used for [`Category::General`].

use crate::error::{BootstrapError, NewsError};
use crate::fetch::{Fetch, fetch_document};
use crate::taxonomy::{Category, CountryCode};
use crate::utils::collapse_whitespace;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Leading menu entries that are "international" and "local" placeholders.
const PLACEHOLDER_ENTRIES: usize = 2;

static MENU_TOPIC_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[role*="menuitem"][href*="topics"]"#).expect("valid menu selector")
});

static TOPIC_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|/)topics(/[^?#]+)").expect("valid topic path regex"));

/// One scraped topic link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub path: String,
}

/// Category and region path tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyMaps {
    topics: HashMap<Category, String>,
    regions: HashMap<CountryCode, String>,
}

impl TaxonomyMaps {
    pub fn topic_path(&self, category: Category) -> Option<&str> {
        self.topics.get(&category).map(String::as_str)
    }

    pub fn region_path(&self, country: CountryCode) -> Option<&str> {
        self.regions.get(&country).map(String::as_str)
    }

    pub fn insert_topic(&mut self, category: Category, path: impl Into<String>) {
        self.topics.insert(category, path.into());
    }

    pub fn insert_region(&mut self, country: CountryCode, path: impl Into<String>) {
        self.regions.insert(country, path.into());
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

/// Inputs to topic discovery.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    /// Home page URL without query, e.g. `https://news.google.com/home`.
    pub home_url: String,
    /// Edition whose menu feeds the category map.
    pub representative: CountryCode,
    /// Paths that replace scraped values after assignment.
    pub overrides: BTreeMap<Category, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Bootstrapping,
    Ready,
}

/// Outcome of the most recent finished discovery attempt.
#[derive(Debug, Default)]
struct LastAttempt {
    failure: Option<Arc<BootstrapError>>,
}

/// Marks discovery as running until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the [`TaxonomyMaps`] and the one-time discovery that fills them.
#[derive(Debug)]
pub struct TopicPathResolver<F> {
    fetcher: Arc<F>,
    settings: BootstrapSettings,
    maps: RwLock<TaxonomyMaps>,
    /// Held for the duration of an attempt; waiters queue here.
    attempt: Mutex<LastAttempt>,
    /// Number of finished attempts, bumped while `attempt` is held.
    finished: AtomicU64,
    ready: AtomicBool,
    in_flight: AtomicBool,
}

impl<F: Fetch> TopicPathResolver<F> {
    pub fn new(fetcher: Arc<F>, settings: BootstrapSettings) -> Self {
        Self {
            fetcher,
            settings,
            maps: RwLock::new(TaxonomyMaps::default()),
            attempt: Mutex::new(LastAttempt::default()),
            finished: AtomicU64::new(0),
            ready: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.ready.load(Ordering::SeqCst) {
            Lifecycle::Ready
        } else if self.in_flight.load(Ordering::SeqCst) {
            Lifecycle::Bootstrapping
        } else {
            Lifecycle::Uninitialized
        }
    }

    /// Run discovery unless it has already succeeded.
    ///
    /// A caller that arrives while an attempt is running waits for that
    /// attempt and returns its outcome instead of starting another one.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the maps are complete. Otherwise the error of the attempt
    /// this caller ran or waited on, shared between every caller of that
    /// attempt. Partial maps stay readable through [`snapshot`](Self::snapshot).
    pub async fn ensure_bootstrapped(&self) -> Result<(), Arc<BootstrapError>> {
        if self.ready.load(Ordering::SeqCst) {
            return Ok(());
        }
        let joined_at = self.finished.load(Ordering::SeqCst);
        let mut last = self.attempt.lock().await;

        if self.ready.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.finished.load(Ordering::SeqCst) != joined_at {
            debug!("Sharing the outcome of the discovery attempt that just finished");
            return match &last.failure {
                Some(e) => Err(Arc::clone(e)),
                None => Ok(()),
            };
        }

        let result = self.bootstrap().await.map_err(Arc::new);
        last.failure = result.as_ref().err().cloned();
        if result.is_ok() {
            self.ready.store(true, Ordering::SeqCst);
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }

    pub fn path_for(&self, category: Category) -> Option<String> {
        self.read_maps().topic_path(category).map(str::to_string)
    }

    pub fn region_path_for(&self, country: CountryCode) -> Option<String> {
        self.read_maps().region_path(country).map(str::to_string)
    }

    /// Copy of the current maps, complete or not.
    pub fn snapshot(&self) -> TaxonomyMaps {
        self.read_maps().clone()
    }

    fn read_maps(&self) -> RwLockReadGuard<'_, TaxonomyMaps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_maps(&self) -> RwLockWriteGuard<'_, TaxonomyMaps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(level = "info", skip(self), fields(representative = %self.settings.representative))]
    async fn bootstrap(&self) -> Result<(), BootstrapError> {
        let _running = InFlight::enter(&self.in_flight);
        info!("Discovering topic paths");

        let results = join_all(
            CountryCode::KNOWN
                .into_iter()
                .map(|country| async move { (country, self.discover(country).await) }),
        )
        .await;

        let mut failures = Vec::new();
        for (country, result) in results {
            match result {
                Ok(entries) => self.apply(country, &entries),
                Err(e) => {
                    warn!(%country, error = %e, "Topic discovery failed for country");
                    failures.push((country, e));
                }
            }
        }

        {
            let mut maps = self.write_maps();
            for (category, path) in &self.settings.overrides {
                debug!(%category, %path, "Applying topic path override");
                maps.insert_topic(*category, path.clone());
            }
        }

        if !failures.is_empty() {
            return Err(BootstrapError::Countries(failures));
        }
        let maps = self.snapshot();
        if maps.topic_count() == 0 {
            return Err(BootstrapError::RepresentativeUnresolved(
                self.settings.representative,
            ));
        }
        info!(
            topics = maps.topic_count(),
            regions = maps.region_count(),
            "Topic paths ready"
        );
        Ok(())
    }

    async fn discover(&self, country: CountryCode) -> Result<Vec<MenuEntry>, NewsError> {
        let url = format!("{}?{}", self.settings.home_url, country.locale_query());
        let html = fetch_document(self.fetcher.as_ref(), &url).await?;
        let entries = extract_menu_entries(&html);
        if entries.len() <= PLACEHOLDER_ENTRIES {
            return Err(NewsError::malformed(
                url,
                format!("found {} topic menu entries, expected at least 3", entries.len()),
            ));
        }
        debug!(%country, count = entries.len(), "Scraped topic menu");
        Ok(entries.into_iter().skip(PLACEHOLDER_ENTRIES).collect())
    }

    fn apply(&self, country: CountryCode, entries: &[MenuEntry]) {
        let mut maps = self.write_maps();
        if let Some(first) = entries.first() {
            maps.insert_region(country, first.path.clone());
        }
        if country == self.settings.representative {
            for (category, path) in assign_categories(entries) {
                maps.insert_topic(category, path);
            }
        }
    }
}

/// Topic links from a home page menu, in document order.
pub fn extract_menu_entries(html: &str) -> Vec<MenuEntry> {
    let document = Html::parse_document(html);
    document
        .select(&MENU_TOPIC_SELECTOR)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let Some(captures) = TOPIC_PATH.captures(href) else {
                debug!(%href, "Skipping menu link without a topic path");
                return None;
            };
            Some(MenuEntry {
                label: collapse_whitespace(element.text()),
                path: captures[1].to_string(),
            })
        })
        .collect()
}

/// Map menu entries (placeholders already removed) onto categories.
///
/// Labels are matched against the known category labels first. Categories
/// left over take the remaining entries in declared order.
pub fn assign_categories(entries: &[MenuEntry]) -> Vec<(Category, String)> {
    let mut claimed = vec![false; entries.len()];
    let mut assigned: Vec<Option<usize>> = vec![None; Category::ALL.len()];

    for (slot, category) in Category::ALL.iter().enumerate() {
        let hit = entries
            .iter()
            .enumerate()
            .find(|(i, e)| !claimed[*i] && category.matches_label(&e.label))
            .map(|(i, _)| i);
        if let Some(i) = hit {
            claimed[i] = true;
            assigned[slot] = Some(i);
        }
    }

    let mut unclaimed = (0..entries.len()).filter(|i| !claimed[*i]);
    for (slot, category) in Category::ALL.iter().enumerate() {
        if assigned[slot].is_some() {
            continue;
        }
        if let Some(i) = unclaimed.next() {
            warn!(
                %category,
                label = %entries[i].label,
                "No menu label matched; assigning topic path by position"
            );
            assigned[slot] = Some(i);
        }
    }

    Category::ALL
        .iter()
        .zip(assigned)
        .filter_map(|(category, i)| i.map(|i| (*category, entries[i].path.clone())))
        .collect()
}
