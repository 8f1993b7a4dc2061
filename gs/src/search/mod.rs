//! Product search
//!
//! A [`SearchBackend`] turns a structured requirement into candidate
//! [`Listing`]s. [`CachedSearch`] wraps any backend with the file cache.

mod cache;
mod cached;
mod llm_search;

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use cache::{CacheError, CacheStats, FileCache};
pub use cached::CachedSearch;
pub use llm_search::LlmSearch;

use crate::llm::LlmError;
use crate::requirements::Requirement;

/// One candidate product offer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Listing {
    pub title: String,
    pub brand: String,
    /// Retailer or site the offer came from
    pub source: String,
    pub price: Option<f64>,
    /// Average rating out of 5
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub url: String,
    pub specs: BTreeMap<String, String>,
}

impl Listing {
    /// Identity used for de-duplication: the URL, else the title
    fn dedup_key(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.is_empty() {
            self.title.trim().to_lowercase()
        } else {
            url.to_lowercase()
        }
    }
}

/// Search failures
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("Search prompt error: {0}")]
    Prompt(String),
}

/// Anything that can find listings for a requirement
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name used in logs and cache keys
    fn name(&self) -> &str;

    async fn search(&self, requirement: &Requirement) -> Result<Vec<Listing>, SearchError>;
}

/// Drop repeated listings, keeping the first occurrence
pub fn dedup_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let before = listings.len();
    let mut seen = HashSet::new();
    let unique: Vec<Listing> = listings.into_iter().filter(|l| seen.insert(l.dedup_key())).collect();
    debug!(%before, after = unique.len(), "dedup_listings: done");
    unique
}
