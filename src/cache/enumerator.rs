//! Read-through department enumeration
//!
//! On a miss the enumerator:
//! 1. Fetches the affiliation profile to learn its listing code
//! 2. Crawls listing pages 1, 2, ... until an empty page ends the listing
//! 3. Stores the accumulated table, then returns it; a listing with no
//!    departments is an error and nothing is stored
//!
//! Concurrent callers asking for the same parent key share one crawl: the
//! second caller waits on a per-key lock and then finds the stored table.

use crate::cache::traits::CacheStore;
use crate::cache::EnumerationTable;
use crate::config::CrawlConfig;
use crate::endpoints::Endpoints;
use crate::extract::{extract_affiliation, parse_department_listing};
use crate::fetch::Fetcher;
use crate::ids::Identifier;
use crate::SintaError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// When a listing crawl stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlPolicy {
    /// Consecutive empty pages that end the listing (1 = stop at the first)
    pub empty_pages_to_stop: u32,

    /// Hard cap on pages fetched
    pub max_pages: Option<u32>,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            empty_pages_to_stop: 1,
            max_pages: None,
        }
    }
}

impl From<&CrawlConfig> for CrawlPolicy {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            empty_pages_to_stop: config.empty_pages_to_stop.max(1),
            max_pages: config.max_pages,
        }
    }
}

/// Memoizes department enumerations per affiliation
pub struct Enumerator {
    fetcher: Fetcher,
    endpoints: Endpoints,
    store: Arc<dyn CacheStore>,
    policy: CrawlPolicy,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Enumerator {
    pub fn new(
        fetcher: Fetcher,
        endpoints: Endpoints,
        store: Arc<dyn CacheStore>,
        policy: CrawlPolicy,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            store,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The configured store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the enumeration for `parent`, crawling only on a cache miss
    pub async fn enumerate(&self, parent: &Identifier) -> Result<EnumerationTable, SintaError> {
        self.enumerate_in(self.store.as_ref(), parent).await
    }

    /// Like [`Enumerator::enumerate`], reading and writing `store` instead
    pub async fn enumerate_in(
        &self,
        store: &dyn CacheStore,
        parent: &Identifier,
    ) -> Result<EnumerationTable, SintaError> {
        let gate = self.gate_for(parent.as_str());
        let result = {
            let _guard = gate.lock().await;
            self.load_or_crawl(store, parent).await
        };
        self.release_gate(parent.as_str(), gate);
        result
    }

    async fn load_or_crawl(
        &self,
        store: &dyn CacheStore,
        parent: &Identifier,
    ) -> Result<EnumerationTable, SintaError> {
        if let Some(table) = store.get(parent.as_str())? {
            tracing::debug!(
                "Cache found, loaded {} departments for affiliation {} from {}",
                table.len(),
                parent,
                store.location()
            );
            return Ok(table);
        }

        tracing::debug!(
            "Cache not found, fetching departments for affiliation {}",
            parent
        );
        let table = self.crawl(parent).await?;

        // An empty listing is never stored; the next call crawls again
        if table.is_empty() {
            tracing::warn!("Listing for affiliation {} had no departments", parent);
            return Err(SintaError::EmptyEnumeration {
                parent: parent.to_string(),
            });
        }

        store.put(parent.as_str(), &table)?;
        tracing::debug!(
            "Saved {} departments for affiliation {} in {}",
            table.len(),
            parent,
            store.location()
        );
        Ok(table)
    }

    /// Crawls the full department listing of `parent`, bypassing the cache
    ///
    /// Any fetch or parse failure aborts the crawl; a partial listing is never
    /// returned.
    pub async fn crawl(&self, parent: &Identifier) -> Result<EnumerationTable, SintaError> {
        let code = self.affiliation_code(parent).await?;

        let mut table = EnumerationTable::new();
        let mut empty_streak = 0;
        let mut page = 1;

        loop {
            if let Some(max) = self.policy.max_pages {
                if page > max {
                    tracing::warn!(
                        "Stopping listing crawl for {} at the {}-page cap",
                        parent,
                        max
                    );
                    break;
                }
            }

            let url = self
                .endpoints
                .department_listing(parent.as_str(), &code, page)?;
            tracing::debug!("Fetching page {}: {}", page, url);

            let body = self.fetcher.get_page(&url).await?;
            let listing = parse_department_listing(&body)?;

            if listing.is_empty() {
                empty_streak += 1;
                if empty_streak >= self.policy.empty_pages_to_stop {
                    break;
                }
            } else {
                empty_streak = 0;
                for entry in listing.entries {
                    table.insert(entry);
                }
                tracing::debug!("Found {} departments", table.len());
            }

            page += 1;
        }

        Ok(table)
    }

    async fn affiliation_code(&self, parent: &Identifier) -> Result<String, SintaError> {
        let url = self.endpoints.affiliation_profile(parent.as_str())?;
        let body = self.fetcher.get_page(&url).await?;
        let affiliation = extract_affiliation(&body, parent.as_str(), url.as_str())?;
        Ok(affiliation.code)
    }

    fn gate_for(&self, parent_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        gates.entry(parent_key.to_string()).or_default().clone()
    }

    /// Drops the gate for `parent_key` unless another caller still holds it
    ///
    /// Clones are only handed out under the map lock, so a count of two (the
    /// map's and ours) means nobody else is waiting.
    fn release_gate(&self, parent_key: &str, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut gates = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let idle = gates
            .get(parent_key)
            .is_some_and(|g| Arc::ptr_eq(g, &gate) && Arc::strong_count(g) == 2);
        if idle {
            gates.remove(parent_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::entry;
    use crate::config::FetcherConfig;

    #[test]
    fn test_policy_from_config() {
        let policy = CrawlPolicy::from(&CrawlConfig {
            empty_pages_to_stop: 3,
            max_pages: Some(10),
        });
        assert_eq!(policy.empty_pages_to_stop, 3);
        assert_eq!(policy.max_pages, Some(10));
        assert_eq!(CrawlPolicy::default().empty_pages_to_stop, 1);
    }

    #[test]
    fn test_same_key_shares_a_gate() {
        let enumerator = Enumerator::new(
            Fetcher::new(&FetcherConfig::default()).unwrap(),
            Endpoints::new("https://example.com").unwrap(),
            Arc::new(crate::cache::SqliteCache::open_in_memory().unwrap()),
            CrawlPolicy::default(),
        );

        let a = enumerator.gate_for("404");
        let b = enumerator.gate_for("404");
        let c = enumerator.gate_for("405");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_gates_are_released_after_enumeration() {
        let store = Arc::new(crate::cache::SqliteCache::open_in_memory().unwrap());
        let table: EnumerationTable = vec![entry("55201", "ef34gh")].into_iter().collect();
        store.put("404", &table).unwrap();

        let enumerator = Enumerator::new(
            Fetcher::new(&FetcherConfig::default()).unwrap(),
            Endpoints::new("http://127.0.0.1:9").unwrap(),
            store,
            CrawlPolicy::default(),
        );

        let parent = Identifier::from(404u64);
        assert_eq!(enumerator.enumerate(&parent).await.unwrap(), table);
        assert!(enumerator.in_flight.lock().unwrap().is_empty());
    }

    #[test]
    fn test_held_gate_is_kept() {
        let enumerator = Enumerator::new(
            Fetcher::new(&FetcherConfig::default()).unwrap(),
            Endpoints::new("https://example.com").unwrap(),
            Arc::new(crate::cache::SqliteCache::open_in_memory().unwrap()),
            CrawlPolicy::default(),
        );

        let first = enumerator.gate_for("404");
        let waiting = enumerator.gate_for("404");
        enumerator.release_gate("404", first);
        assert_eq!(enumerator.in_flight.lock().unwrap().len(), 1);

        enumerator.release_gate("404", waiting);
        assert!(enumerator.in_flight.lock().unwrap().is_empty());
    }
}
