//! Compact wire format for article lists.
//!
//! The envelope is a `bincode` (standard config) encoding of
//!
//! ```text
//! Envelope { version: u8, total_results: u64, articles: [WireArticle] }
//! WireArticle { source_id?, source_name, author, title, url, image_url?, published_at }
//! ```
//!
//! `description` and `content` are not carried; decoded articles have both
//! set to `None`.

use crate::error::DecodeError;
use crate::models::{Article, Source};
use bincode::error::EncodeError;
use bincode::{Decode, Encode};
use tracing::error;

const WIRE_VERSION: u8 = 1;

#[derive(Debug, Encode, Decode)]
struct Envelope {
    version: u8,
    total_results: u64,
    articles: Vec<WireArticle>,
}

#[derive(Debug, Encode, Decode)]
struct WireArticle {
    source_id: Option<String>,
    source_name: String,
    author: String,
    title: String,
    url: String,
    image_url: Option<String>,
    published_at: String,
}

impl From<&Article> for WireArticle {
    fn from(a: &Article) -> Self {
        Self {
            source_id: a.source.id.clone(),
            source_name: a.source.name.clone(),
            author: a.author.clone(),
            title: a.title.clone(),
            url: a.url.clone(),
            image_url: a.url_to_image.clone(),
            published_at: a.published_at.clone(),
        }
    }
}

impl From<WireArticle> for Article {
    fn from(w: WireArticle) -> Self {
        Article {
            source: Source {
                id: w.source_id,
                name: w.source_name,
            },
            author: w.author,
            title: w.title,
            description: None,
            url: w.url,
            url_to_image: w.image_url,
            published_at: w.published_at,
            content: None,
        }
    }
}

/// Encode `articles` into a versioned envelope carrying `total_results`.
pub fn encode(articles: &[Article], total_results: usize) -> Result<Vec<u8>, EncodeError> {
    let envelope = Envelope {
        version: WIRE_VERSION,
        total_results: total_results as u64,
        articles: articles.iter().map(WireArticle::from).collect(),
    };
    bincode::encode_to_vec(&envelope, bincode::config::standard())
}

/// Decode an envelope produced by [`encode`].
///
/// # Returns
///
/// The articles in their original order and the carried total, or a
/// [`DecodeError`] for malformed input, an unknown version or trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<(Vec<Article>, usize), DecodeError> {
    let (envelope, read): (Envelope, usize) =
        bincode::decode_from_slice(bytes, bincode::config::standard())?;
    if envelope.version != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion(envelope.version));
    }
    if read != bytes.len() {
        return Err(DecodeError::TrailingBytes(bytes.len() - read));
    }
    let total = usize::try_from(envelope.total_results)
        .map_err(|_| DecodeError::TotalOverflow(envelope.total_results))?;
    Ok((envelope.articles.into_iter().map(Article::from).collect(), total))
}

/// Decode for display paths: a bad payload is logged and read as empty.
pub fn decode_or_empty(bytes: &[u8]) -> (Vec<Article>, usize) {
    decode(bytes).unwrap_or_else(|e| {
        error!(error = %e, bytes = bytes.len(), "Undecodable article envelope; treating as empty");
        (Vec::new(), 0)
    })
}
