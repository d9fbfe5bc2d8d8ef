use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use customsearch_client::{CustomSearchError, Credentials, DateRange};
use sitewatch_store::Site;

use crate::credentials::{resolve_credentials, CredentialDefaults};
use crate::ingest::ingest;
use crate::traits::{CrawlStore, SiteSearcher};

#[derive(Error, Debug)]
pub enum CrawlError {
    /// Credentials are missing. The site is left untouched.
    #[error("{0}")]
    Config(String),

    /// Another crawl of this site is running in this process.
    #[error("A crawl of this site is already in progress")]
    AlreadyRunning(Uuid),

    #[error("{0}")]
    Search(#[from] CustomSearchError),

    #[error("{0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutcome {
    pub site_id: Uuid,
    pub new_pages: usize,
    pub total_found: usize,
    pub crawled_at: DateTime<Utc>,
}

/// Searches a site, records unseen pages, and writes the site's crawl status.
///
/// Shared by on-demand requests and the scheduler. Crawls of the same site
/// never overlap within this process.
pub struct Crawler {
    store: Arc<dyn CrawlStore>,
    searcher: Arc<dyn SiteSearcher>,
    defaults: CredentialDefaults,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl Crawler {
    pub fn new(
        store: Arc<dyn CrawlStore>,
        searcher: Arc<dyn SiteSearcher>,
        defaults: CredentialDefaults,
    ) -> Self {
        Self {
            store,
            searcher,
            defaults,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CrawlStore> {
        &self.store
    }

    /// Stored settings first, environment defaults second.
    pub async fn credentials(&self) -> anyhow::Result<Option<Credentials>> {
        resolve_credentials(self.store.as_ref(), &self.defaults).await
    }

    /// Crawl one site, resolving credentials first.
    pub async fn crawl_site(&self, site: &Site, range: DateRange) -> Result<CrawlOutcome, CrawlError> {
        let _guard = self.claim(site.id)?;

        let credentials = self
            .credentials()
            .await?
            .ok_or_else(|| CrawlError::Config(CustomSearchError::MissingCredentials.to_string()))?;

        self.crawl_claimed(site, &credentials, range).await
    }

    pub fn is_running(&self, site_id: Uuid) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(&site_id))
            .unwrap_or(false)
    }

    async fn crawl_claimed(
        &self,
        site: &Site,
        credentials: &Credentials,
        range: DateRange,
    ) -> Result<CrawlOutcome, CrawlError> {
        info!(site_id = %site.id, domain = site.domain.as_str(), %range, "Crawling site");

        match self.search_and_ingest(site, credentials, range).await {
            Ok(outcome) => {
                if let Err(e) = self.store.record_success(site.id, outcome.crawled_at).await {
                    error!(site_id = %site.id, error = %e, "Failed to record crawl success");
                }
                info!(
                    site_id = %site.id,
                    domain = site.domain.as_str(),
                    total_found = outcome.total_found,
                    new_pages = outcome.new_pages,
                    "Crawl complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(site_id = %site.id, domain = site.domain.as_str(), error = %message, "Crawl failed");
                if let Err(write_err) = self.store.record_failure(site.id, &message).await {
                    error!(site_id = %site.id, error = %write_err, "Failed to record crawl failure");
                }
                Err(e)
            }
        }
    }

    async fn search_and_ingest(
        &self,
        site: &Site,
        credentials: &Credentials,
        range: DateRange,
    ) -> Result<CrawlOutcome, CrawlError> {
        let results = self.searcher.search(credentials, &site.domain, range).await?;
        let ingested = ingest(self.store.as_ref(), site.id, &results).await?;

        Ok(CrawlOutcome {
            site_id: site.id,
            new_pages: ingested.new_pages,
            total_found: ingested.total_found,
            crawled_at: Utc::now(),
        })
    }

    fn claim(&self, site_id: Uuid) -> Result<InFlight<'_>, CrawlError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| CrawlError::Store(anyhow::anyhow!("in-flight set poisoned")))?;
        if !set.insert(site_id) {
            return Err(CrawlError::AlreadyRunning(site_id));
        }
        Ok(InFlight {
            set: &self.in_flight,
            site_id,
        })
    }
}

/// Releases a site's in-flight slot on drop.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    site_id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.site_id);
        }
    }
}
