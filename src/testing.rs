//! Test doubles shared by the module tests.

use crate::error::FetchError;
use crate::fetch::{Fetch, FetchResponse};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves canned responses keyed by exact URL; unknown URLs fail as transport errors.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, (u16, String)>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    /// Suspend every GET for `delay` so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

impl Fetch for StaticFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.pages.get(url) {
            Some((status, body)) => Ok(FetchResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(FetchError::Transport {
                url: url.to_string(),
                source: format!("no fixture for {url}").into(),
            }),
        }
    }
}

/// A home page with the two placeholder topics followed by `labels` as topic links.
pub fn home_page(labels: &[(&str, &str)]) -> String {
    let mut menu = String::from(
        r#"<a role="menuitem" href="./topics/WORLD?hl=en-US&amp;gl=US">World</a>
           <a role="menuitem" href="./topics/LOCAL?hl=en-US&amp;gl=US">Your local news</a>"#,
    );
    for (label, path) in labels {
        menu.push_str(&format!(
            r#"<a role="menuitem" href="./topics/{path}?hl=en-US&amp;gl=US&amp;ceid=US:en">{label}</a>"#
        ));
    }
    format!(
        r#"<html><body>
           <nav>
             <a role="menuitem" href="./home?hl=en-US">Home</a>
             <div role="menuitem">For you</div>
             {menu}
           </nav>
           </body></html>"#
    )
}

/// The six-category menu used by most fixtures.
pub fn standard_home_page() -> String {
    home_page(&[
        ("U.S.", "REGION_US"),
        ("Business", "BUSINESS"),
        ("Technology", "TECH"),
        ("Entertainment", "ENT"),
        ("Sports", "SPORTS"),
        ("Health", "HEALTH"),
    ])
}
