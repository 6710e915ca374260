//! Closed taxonomies used to address Google News listings.
//!
//! - [`Category`]: the app-level topic set, in its declared enumeration order
//! - [`CountryCode`]: supported editions, each carrying a locale triplet
//!
//! Both parse from strings (CLI and YAML config) and render back to the
//! canonical fragments used in URLs and cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a category or country string is not part of the taxonomy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxonomyParseError {
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("unknown country code `{0}`")]
    UnknownCountry(String),
}

/// News category as exposed to clients.
///
/// The variant order is significant: bootstrap falls back to assigning
/// scraped topic paths positionally in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Business,
    Technology,
    Entertainment,
    Sports,
    Health,
}

impl Category {
    /// Every category in declared enumeration order.
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Business,
        Category::Technology,
        Category::Entertainment,
        Category::Sports,
        Category::Health,
    ];

    /// Lowercase name used in URLs, cache keys and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Entertainment => "entertainment",
            Category::Sports => "sports",
            Category::Health => "health",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Business => "Business",
            Category::Technology => "Technology",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::Health => "Health",
        }
    }

    /// Position of the category in client menus.
    pub fn display_order(self) -> u8 {
        match self {
            Category::General => 0,
            Category::Business => 1,
            Category::Health => 2,
            Category::Technology => 3,
            Category::Sports => 5,
            Category::Entertainment => 6,
        }
    }

    /// Menu labels Google News uses for this topic in the supported editions.
    fn menu_labels(self) -> &'static [&'static str] {
        match self {
            Category::General => &["General", "一般"],
            Category::Business => &["Business", "商業", "商业"],
            Category::Technology => &["Technology", "Science & Technology", "科技"],
            Category::Entertainment => &["Entertainment", "娛樂", "娱乐"],
            Category::Sports => &["Sports", "Sport", "體育", "体育"],
            Category::Health => &["Health", "健康"],
        }
    }

    /// Whether a scraped menu label names this category.
    pub fn matches_label(self, label: &str) -> bool {
        let label = label.trim();
        self.menu_labels()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TaxonomyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TaxonomyParseError::UnknownCategory(s.to_string()))
    }
}

/// Google News edition. `None` is the "unspecified" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CountryCode {
    BR,
    CN,
    DE,
    FR,
    GB,
    IN,
    TW,
    JP,
    MX,
    US,
    #[serde(rename = "none", alias = "")]
    None,
}

/// The `hl`, `gl` and `ceid` query parameters the site requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleTriplet {
    pub hl: &'static str,
    pub gl: &'static str,
    pub ceid: &'static str,
}

impl CountryCode {
    /// Every real edition, without the `None` sentinel.
    pub const KNOWN: [CountryCode; 10] = [
        CountryCode::BR,
        CountryCode::CN,
        CountryCode::DE,
        CountryCode::FR,
        CountryCode::GB,
        CountryCode::IN,
        CountryCode::TW,
        CountryCode::JP,
        CountryCode::MX,
        CountryCode::US,
    ];

    /// Fragment used in cache keys and push topics.
    pub fn code(self) -> &'static str {
        match self {
            CountryCode::BR => "BR",
            CountryCode::CN => "CN",
            CountryCode::DE => "DE",
            CountryCode::FR => "FR",
            CountryCode::GB => "GB",
            CountryCode::IN => "IN",
            CountryCode::TW => "TW",
            CountryCode::JP => "JP",
            CountryCode::MX => "MX",
            CountryCode::US => "US",
            CountryCode::None => "none",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CountryCode::BR => "Brazil",
            CountryCode::CN => "China",
            CountryCode::DE => "Germany",
            CountryCode::FR => "France",
            CountryCode::GB => "United Kingdom",
            CountryCode::IN => "India",
            CountryCode::TW => "Taiwan",
            CountryCode::JP => "Japan",
            CountryCode::MX => "Mexico",
            CountryCode::US => "United States",
            CountryCode::None => "Unspecified",
        }
    }

    pub fn locale(self) -> Option<LocaleTriplet> {
        let (hl, gl, ceid) = match self {
            CountryCode::BR => ("pt-BR", "BR", "BR:pt-419"),
            CountryCode::CN => ("zh-CN", "CN", "CN:zh-Hans"),
            CountryCode::DE => ("de", "DE", "DE:de"),
            CountryCode::FR => ("fr", "FR", "FR:fr"),
            CountryCode::GB => ("en-GB", "GB", "GB:en"),
            CountryCode::IN => ("en-IN", "IN", "IN:en"),
            CountryCode::TW => ("zh-TW", "TW", "TW:zh-Hant"),
            CountryCode::JP => ("ja", "JP", "JP:ja"),
            CountryCode::MX => ("es-419", "MX", "MX:es-419"),
            CountryCode::US => ("en-US", "US", "US:en"),
            CountryCode::None => return None,
        };
        Some(LocaleTriplet { hl, gl, ceid })
    }

    /// `hl=..&gl=..&ceid=..`, or an empty string for `None`.
    pub fn locale_query(self) -> String {
        self.locale()
            .map(|l| format!("hl={}&gl={}&ceid={}", l.hl, l.gl, l.ceid))
            .unwrap_or_default()
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CountryCode {
    type Err = TaxonomyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(CountryCode::None);
        }
        CountryCode::KNOWN
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| TaxonomyParseError::UnknownCountry(s.to_string()))
    }
}
