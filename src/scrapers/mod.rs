//! Listing scrapers for Google News documents.
//!
//! Both scrapers turn one fetched document into an ordered list of
//! [`Article`](crate::models::Article) records and share that record shape.
//!
//! | Document | Module | Method | Notes |
//! |----------|--------|--------|-------|
//! | Rendered topic/search page | [`markup`] | HTML scraping | Partial extraction, never fails |
//! | RSS topic/search feed | [`feed`] | XML deserialization | Canonical dates, no images |
//!
//! The pipeline picks the scraper from the response format: binary replies
//! are built from feeds, structured replies from rendered pages.

pub mod feed;
pub mod markup;
