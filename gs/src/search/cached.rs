//! Cache wrapper for any search backend

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{FileCache, Listing, SearchBackend, SearchError};
use crate::requirements::Requirement;

/// Serves repeated searches for the same requirement from the file cache
pub struct CachedSearch<B: SearchBackend> {
    inner: B,
    cache: FileCache,
}

impl<B: SearchBackend> CachedSearch<B> {
    pub fn new(inner: B, cache: FileCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Key on the structured fields only; free text and scoring vary between
    /// runs that ask for the same thing
    fn cache_key(&self, requirement: &Requirement) -> String {
        let normalized = Requirement {
            raw_input: String::new(),
            completeness_score: 0.0,
            ..requirement.clone()
        };
        let body = serde_json::to_string(&normalized).unwrap_or_else(|_| requirement.search_query());
        format!("search:{}:{}", self.inner.name(), body)
    }
}

#[async_trait]
impl<B: SearchBackend> SearchBackend for CachedSearch<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, requirement: &Requirement) -> Result<Vec<Listing>, SearchError> {
        let key = self.cache_key(requirement);

        if let Some(value) = self.cache.get(&key) {
            match serde_json::from_value::<Vec<Listing>>(value) {
                Ok(listings) => {
                    info!(count = listings.len(), "search: cache hit");
                    return Ok(listings);
                }
                Err(e) => warn!(error = %e, "search: cached listings unreadable, searching again"),
            }
        }

        debug!(backend = %self.inner.name(), "search: cache miss");
        let listings = self.inner.search(requirement).await?;

        match serde_json::to_value(&listings) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, value) {
                    warn!(error = %e, "search: failed to cache listings");
                }
            }
            Err(e) => warn!(error = %e, "search: failed to serialize listings"),
        }

        Ok(listings)
    }
}
