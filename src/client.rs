//! Caller-facing entry point
//!
//! [`SintaClient`] owns one HTTP client, one dispatcher and one enumeration
//! cache, all built from an explicit [`Config`]. Every batch method comes in
//! two flavors:
//! - `authors`, `affiliations`, `departments` return shaped [`Output`]
//! - `*_report` return the raw [`BatchReport`] with per-identifier failures

use crate::cache::{
    open_store, CacheStore, CrawlPolicy, EnumerationTable, Enumerator, JsonFileCache,
};
use crate::config::{validate, Config};
use crate::endpoints::Endpoints;
use crate::extract::{extract_affiliation, extract_author, extract_department};
use crate::fetch::{BatchReport, Dispatcher, Fetcher};
use crate::ids::{Identifier, Identifiers};
use crate::output::{format_output, Output, OutputFormat};
use crate::record::{AffiliationRecord, AuthorRecord, DepartmentRecord};
use crate::{Result, SintaError};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Shared read-only state handed to every worker
#[derive(Debug, Clone)]
struct PageContext {
    fetcher: Fetcher,
    endpoints: Endpoints,
}

/// A department worker's target: the two hashes its profile URL needs
#[derive(Debug, Clone)]
struct DepartmentTarget {
    univ_hash: String,
    department_hash: String,
}

impl fmt::Display for DepartmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.department_hash)
    }
}

/// Fetches records from one directory deployment
pub struct SintaClient {
    context: PageContext,
    dispatcher: Dispatcher,
    enumerator: Enumerator,
}

impl SintaClient {
    /// Creates a client using the cache backend named in `config`
    ///
    /// # Returns
    ///
    /// * `Ok(SintaClient)` - Ready to fetch
    /// * `Err(SintaError)` - Invalid configuration, or the cache or HTTP client
    ///   could not be set up
    pub fn new(config: &Config) -> Result<Self> {
        validate(config)?;
        let store = open_store(&config.cache)?;
        Self::with_store(config, store)
    }

    /// Creates a client backed by an explicit cache store
    pub fn with_store(config: &Config, store: Arc<dyn CacheStore>) -> Result<Self> {
        validate(config)?;

        let fetcher = Fetcher::new(&config.fetcher)?;
        let endpoints = Endpoints::new(&config.source.domain)?;
        let enumerator = Enumerator::new(
            fetcher.clone(),
            endpoints.clone(),
            store,
            CrawlPolicy::from(&config.crawl),
        );

        tracing::debug!(
            "Client ready for {} (cache: {})",
            endpoints.base(),
            enumerator.store().location()
        );

        Ok(Self {
            context: PageContext { fetcher, endpoints },
            dispatcher: Dispatcher::from_config(&config.fetcher),
            enumerator,
        })
    }

    /// Fetches author profiles
    pub async fn authors(
        &self,
        ids: impl Into<Identifiers>,
        format: OutputFormat,
    ) -> Result<Output<AuthorRecord>> {
        format_output(self.authors_report(ids).await.records, format)
    }

    /// Fetches author profiles, reporting which identifiers were dropped
    pub async fn authors_report(&self, ids: impl Into<Identifiers>) -> BatchReport<AuthorRecord> {
        let ids = ids.into();
        tracing::info!("Fetching {} author profiles", ids.len());
        self.dispatcher
            .dispatch_report(ids.into_vec(), self.context.clone(), fetch_author)
            .await
    }

    /// Fetches affiliation profiles
    pub async fn affiliations(
        &self,
        ids: impl Into<Identifiers>,
        format: OutputFormat,
    ) -> Result<Output<AffiliationRecord>> {
        format_output(self.affiliations_report(ids).await.records, format)
    }

    /// Fetches affiliation profiles, reporting which identifiers were dropped
    pub async fn affiliations_report(
        &self,
        ids: impl Into<Identifiers>,
    ) -> BatchReport<AffiliationRecord> {
        let ids = ids.into();
        tracing::info!("Fetching {} affiliation profiles", ids.len());
        self.dispatcher
            .dispatch_report(ids.into_vec(), self.context.clone(), fetch_affiliation)
            .await
    }

    /// Fetches department profiles under one affiliation
    ///
    /// `ids` are human-readable department codes. They are resolved through
    /// the affiliation's cached enumeration (crawled on first use), and each
    /// matching row is fetched by its hashed id.
    ///
    /// # Arguments
    ///
    /// * `ids` - Department codes to fetch
    /// * `affiliation_id` - The parent affiliation
    /// * `format` - Result shape
    /// * `cache_dir` - Read and write the enumeration in this directory instead
    ///   of the configured store
    ///
    /// # Returns
    ///
    /// * `Ok(Output)` - One record per matching row that fetched and parsed
    /// * `Err(SintaError::NoMatchingEntries)` - None of `ids` is in the listing
    /// * `Err(SintaError)` - The listing could not be crawled or cached
    pub async fn departments(
        &self,
        ids: impl Into<Identifiers>,
        affiliation_id: &Identifier,
        format: OutputFormat,
        cache_dir: Option<&Path>,
    ) -> Result<Output<DepartmentRecord>> {
        let report = self
            .departments_report(ids, affiliation_id, cache_dir)
            .await?;
        format_output(report.records, format)
    }

    /// Fetches department profiles, reporting which rows were dropped
    ///
    /// Failures are labelled with the row's hashed id.
    pub async fn departments_report(
        &self,
        ids: impl Into<Identifiers>,
        affiliation_id: &Identifier,
        cache_dir: Option<&Path>,
    ) -> Result<BatchReport<DepartmentRecord>> {
        let ids = ids.into();
        if ids.is_empty() {
            return Err(SintaError::NoMatchingEntries {
                parent: affiliation_id.to_string(),
                ids: Vec::new(),
            });
        }

        let table = match cache_dir {
            Some(dir) => {
                let store = JsonFileCache::new(dir);
                self.enumerator.enumerate_in(&store, affiliation_id).await?
            }
            None => self.enumerator.enumerate(affiliation_id).await?,
        };

        let targets: Vec<DepartmentTarget> = table
            .select(affiliation_id.as_str(), &ids)?
            .into_iter()
            .map(|entry| DepartmentTarget {
                univ_hash: entry.univ_id_hash.clone(),
                department_hash: entry.department_id_hash.clone(),
            })
            .collect();

        tracing::info!(
            "Fetching {} department profiles under affiliation {}",
            targets.len(),
            affiliation_id
        );

        let context = (self.context.clone(), affiliation_id.clone());
        Ok(self
            .dispatcher
            .dispatch_report(targets, context, fetch_department)
            .await)
    }

    /// Returns the department listing of an affiliation, crawling on a miss
    pub async fn enumerate_departments(
        &self,
        affiliation_id: &Identifier,
    ) -> Result<EnumerationTable> {
        self.enumerator.enumerate(affiliation_id).await
    }

    /// Drops the cached listing of an affiliation
    ///
    /// Returns true if a listing was cached.
    pub fn forget_departments(&self, affiliation_id: &Identifier) -> Result<bool> {
        let removed = self.enumerator.store().remove(affiliation_id.as_str())?;
        if removed {
            tracing::info!("Removed cached departments for affiliation {}", affiliation_id);
        }
        Ok(removed)
    }

    /// The configured cache store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        self.enumerator.store()
    }
}

async fn fetch_author(id: Identifier, ctx: PageContext) -> Result<AuthorRecord> {
    let url = ctx.endpoints.author_profile(id.as_str())?;
    let body = ctx.fetcher.get_page(&url).await?;
    Ok(extract_author(&body, id.as_str(), url.as_str())?)
}

async fn fetch_affiliation(id: Identifier, ctx: PageContext) -> Result<AffiliationRecord> {
    let url = ctx.endpoints.affiliation_profile(id.as_str())?;
    let body = ctx.fetcher.get_page(&url).await?;
    Ok(extract_affiliation(&body, id.as_str(), url.as_str())?)
}

async fn fetch_department(
    target: DepartmentTarget,
    (ctx, affiliation_id): (PageContext, Identifier),
) -> Result<DepartmentRecord> {
    let url = ctx.endpoints.department_profile(
        affiliation_id.as_str(),
        &target.univ_hash,
        &target.department_hash,
    )?;
    let body = ctx.fetcher.get_page(&url).await?;
    Ok(extract_department(
        &body,
        &target.department_hash,
        url.as_str(),
    )?)
}
