//! Post-processing order for search results.
//!
//! Only [`SortKey::PublishedAt`] reorders anything. The source site exposes
//! no relevancy or popularity signal, so those keys leave the listing in the
//! order the site returned it.

use crate::models::{Article, PUBLISHED_AT_FORMAT, SortKey};
use chrono::{NaiveDateTime, Utc};
use std::cmp::Reverse;
use tracing::debug;

pub fn sort_articles(articles: Vec<Article>, key: SortKey) -> Vec<Article> {
    sort_articles_at(articles, key, Utc::now().naive_utc())
}

/// Sort with `now` standing in for dates that do not parse.
///
/// Articles with unreadable dates therefore land among the newest. The sort
/// is stable, so equal timestamps keep their listing order.
pub fn sort_articles_at(mut articles: Vec<Article>, key: SortKey, now: NaiveDateTime) -> Vec<Article> {
    match key {
        SortKey::PublishedAt => {
            articles.sort_by_cached_key(|a| {
                Reverse(
                    NaiveDateTime::parse_from_str(a.published_at.trim(), PUBLISHED_AT_FORMAT)
                        .unwrap_or(now),
                )
            });
            articles
        }
        SortKey::Relevancy | SortKey::Popularity => {
            debug!(key = key.as_str(), "Sort key has no upstream signal; keeping listing order");
            articles
        }
        SortKey::None => articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dated(url: &str, published_at: &str) -> Article {
        Article {
            url: url.to_string(),
            published_at: published_at.to_string(),
            ..Default::default()
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn urls(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.url.as_str()).collect()
    }

    #[test]
    fn test_published_at_most_recent_first() {
        let articles = vec![
            dated("jan", "2024-01-01 09:00"),
            dated("mar", "2024-03-01 09:00"),
        ];
        let sorted = sort_articles_at(articles, SortKey::PublishedAt, now());
        assert_eq!(urls(&sorted), ["mar", "jan"]);
    }

    #[test]
    fn test_unparseable_dates_rank_as_now() {
        let articles = vec![
            dated("old", "2024-01-01 09:00"),
            dated("future", "2030-01-01 00:00"),
            dated("relative", "2 hours ago"),
        ];
        let sorted = sort_articles_at(articles, SortKey::PublishedAt, now());
        assert_eq!(urls(&sorted), ["future", "relative", "old"]);
    }

    #[test]
    fn test_equal_dates_keep_listing_order() {
        let articles = vec![
            dated("a", "2024-02-01 10:00"),
            dated("b", "2024-02-01 10:00"),
            dated("c", "2024-02-02 10:00"),
        ];
        let sorted = sort_articles_at(articles, SortKey::PublishedAt, now());
        assert_eq!(urls(&sorted), ["c", "a", "b"]);
    }

    #[test]
    fn test_relevancy_and_popularity_are_no_ops() {
        let articles = vec![
            dated("jan", "2024-01-01 09:00"),
            dated("mar", "2024-03-01 09:00"),
        ];
        for key in [SortKey::Relevancy, SortKey::Popularity, SortKey::None] {
            let sorted = sort_articles_at(articles.clone(), key, now());
            assert_eq!(urls(&sorted), ["jan", "mar"]);
        }
    }
}
