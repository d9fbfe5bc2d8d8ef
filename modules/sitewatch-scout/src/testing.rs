// Test mocks for the crawl pipeline.
//
// - MockCrawlStore (CrawlStore): stateful in-memory sites, pages, settings
// - MockSearcher (SiteSearcher): domain -> canned results or provider error
//
// Plus `site()` for building Site rows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use customsearch_client::{CustomSearchError, Credentials, DateRange, SearchItem};
use sitewatch_common::SiteStatus;
use sitewatch_store::Site;

use crate::traits::{CrawlStore, SiteSearcher};

/// An active, never-crawled site.
pub fn site(name: &str, domain: &str, crawl_interval: &str) -> Site {
    let now = Utc::now();
    Site {
        id: Uuid::new_v4(),
        name: name.to_string(),
        domain: domain.to_string(),
        crawl_interval: crawl_interval.to_string(),
        last_crawled_at: None,
        status: SiteStatus::Active,
        error_message: None,
        created_at: now,
        updated_at: now,
        page_count: 0,
    }
}

pub fn result(link: &str, title: &str) -> SearchItem {
    SearchItem {
        title: title.to_string(),
        link: link.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockCrawlStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredPage {
    pub url: String,
    pub title: String,
    pub discovered_at: DateTime<Utc>,
    pub is_read: bool,
}

/// In-memory store. Builder: `.with_site()`, `.with_page()`, `.with_setting()`.
#[derive(Default)]
pub struct MockCrawlStore {
    sites: Mutex<Vec<Site>>,
    pages: Mutex<HashMap<Uuid, Vec<StoredPage>>>,
    settings: Mutex<HashMap<String, String>>,
    fail_inserts: bool,
    fail_listing: bool,
}

impl MockCrawlStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(self, site: Site) -> Self {
        self.sites.lock().unwrap().push(site);
        self
    }

    pub fn with_page(self, site_id: Uuid, url: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(site_id)
            .or_default()
            .push(StoredPage {
                url: url.to_string(),
                title: String::new(),
                discovered_at: Utc::now(),
                is_read: true,
            });
        self
    }

    pub fn with_setting(self, key: &str, value: &str) -> Self {
        self.settings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Change a setting after construction, e.g. between two crawls.
    pub fn set_setting(&self, key: &str, value: &str) {
        self.settings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Every page insert fails.
    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    /// Listing active sites fails.
    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn site_by_id(&self, id: Uuid) -> Option<Site> {
        self.sites.lock().unwrap().iter().find(|s| s.id == id).cloned()
    }

    pub fn pages_for(&self, site_id: Uuid) -> Vec<StoredPage> {
        self.pages
            .lock()
            .unwrap()
            .get(&site_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn urls_for(&self, site_id: Uuid) -> HashSet<String> {
        self.pages_for(site_id).into_iter().map(|p| p.url).collect()
    }

    fn update_site(&self, id: Uuid, f: impl FnOnce(&mut Site)) {
        if let Some(site) = self.sites.lock().unwrap().iter_mut().find(|s| s.id == id) {
            f(site);
        }
    }
}

#[async_trait]
impl CrawlStore for MockCrawlStore {
    async fn known_urls(&self, site_id: Uuid) -> Result<HashSet<String>> {
        Ok(self.urls_for(site_id))
    }

    async fn insert_page(
        &self,
        site_id: Uuid,
        url: &str,
        title: &str,
        discovered_at: DateTime<Utc>,
    ) -> Result<bool> {
        if self.fail_inserts {
            bail!("insert failed");
        }
        let mut pages = self.pages.lock().unwrap();
        let entries = pages.entry(site_id).or_default();
        if entries.iter().any(|p| p.url == url) {
            return Ok(false);
        }
        entries.push(StoredPage {
            url: url.to_string(),
            title: title.to_string(),
            discovered_at,
            is_read: false,
        });
        Ok(true)
    }

    async fn record_success(&self, site_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.update_site(site_id, |s| {
            s.status = SiteStatus::Active;
            s.last_crawled_at = Some(at);
            s.error_message = None;
        });
        Ok(())
    }

    async fn record_failure(&self, site_id: Uuid, message: &str) -> Result<()> {
        self.update_site(site_id, |s| {
            s.status = SiteStatus::Error;
            s.error_message = Some(message.to_string());
        });
        Ok(())
    }

    async fn active_sites(&self) -> Result<Vec<Site>> {
        if self.fail_listing {
            bail!("connection refused");
        }
        let mut sites: Vec<Site> = self
            .sites
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.status == SiteStatus::Active)
            .cloned()
            .collect();
        sites.sort_by_key(|s| s.last_crawled_at);
        Ok(sites)
    }

    async fn setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.lock().unwrap().get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

enum Canned {
    Results(Vec<SearchItem>),
    Provider(String),
}

/// Domain-keyed searcher. Unregistered domains return no results.
/// Builder: `.on_domain()`, `.failing_domain()`, `.blocking()`, `.after_each_search()`.
#[derive(Default)]
pub struct MockSearcher {
    responses: HashMap<String, Canned>,
    calls: AtomicUsize,
    ranges: Mutex<Vec<DateRange>>,
    api_keys: Mutex<Vec<String>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    after_search: Option<Box<dyn Fn() + Send + Sync>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_domain(mut self, domain: &str, results: Vec<SearchItem>) -> Self {
        self.responses.insert(domain.to_string(), Canned::Results(results));
        self
    }

    pub fn failing_domain(mut self, domain: &str, message: &str) -> Self {
        self.responses
            .insert(domain.to_string(), Canned::Provider(message.to_string()));
        self
    }

    /// Each search signals `entered` and then waits on `release`.
    pub fn blocking(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    /// Runs after every search returns.
    pub fn after_each_search(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.after_search = Some(Box::new(f));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ranges(&self) -> Vec<DateRange> {
        self.ranges.lock().unwrap().clone()
    }

    /// API key of each search, in call order.
    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl SiteSearcher for MockSearcher {
    async fn search(
        &self,
        credentials: &Credentials,
        domain: &str,
        range: DateRange,
    ) -> customsearch_client::Result<Vec<SearchItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push(range);
        self.api_keys
            .lock()
            .unwrap()
            .push(credentials.api_key().to_string());

        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }

        let response = match self.responses.get(domain) {
            Some(Canned::Results(items)) => Ok(items.clone()),
            Some(Canned::Provider(message)) => Err(CustomSearchError::Provider(message.clone())),
            None => Ok(Vec::new()),
        };
        if let Some(f) = &self.after_search {
            f();
        }
        response
    }
}
