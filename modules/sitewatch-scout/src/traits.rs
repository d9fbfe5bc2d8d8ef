// Trait seams for the crawl pipeline.
//
// CrawlStore covers every read and write a crawl makes against Postgres.
// SiteSearcher covers the search provider.
//
// The crawler and scheduler only see these traits, so tests run them against
// MockCrawlStore and MockSearcher with no network and no database.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use customsearch_client::{CustomSearchClient, Credentials, DateRange, SearchItem};
use sitewatch_store::{Page, PgPool, Setting, Site};

// ---------------------------------------------------------------------------
// CrawlStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CrawlStore: Send + Sync {
    /// Every URL already recorded for a site.
    async fn known_urls(&self, site_id: Uuid) -> Result<HashSet<String>>;

    /// Insert an unread page; returns false if the URL was already recorded.
    async fn insert_page(
        &self,
        site_id: Uuid,
        url: &str,
        title: &str,
        discovered_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn record_success(&self, site_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn record_failure(&self, site_id: Uuid, message: &str) -> Result<()>;

    /// Sites the scheduler may crawl.
    async fn active_sites(&self) -> Result<Vec<Site>>;

    async fn setting(&self, key: &str) -> Result<Option<String>>;
}

/// `CrawlStore` over the shared Postgres pool.
#[derive(Clone)]
pub struct PgCrawlStore {
    pool: PgPool,
}

impl PgCrawlStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrawlStore for PgCrawlStore {
    async fn known_urls(&self, site_id: Uuid) -> Result<HashSet<String>> {
        Page::known_urls(site_id, &self.pool).await
    }

    async fn insert_page(
        &self,
        site_id: Uuid,
        url: &str,
        title: &str,
        discovered_at: DateTime<Utc>,
    ) -> Result<bool> {
        Page::insert_if_new(site_id, url, title, discovered_at, &self.pool).await
    }

    async fn record_success(&self, site_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        Site::record_crawl_success(site_id, at, &self.pool).await
    }

    async fn record_failure(&self, site_id: Uuid, message: &str) -> Result<()> {
        Site::record_crawl_failure(site_id, message, &self.pool).await
    }

    async fn active_sites(&self) -> Result<Vec<Site>> {
        Site::find_active(&self.pool).await
    }

    async fn setting(&self, key: &str) -> Result<Option<String>> {
        Setting::get(key, &self.pool).await
    }
}

// ---------------------------------------------------------------------------
// SiteSearcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SiteSearcher: Send + Sync {
    /// Every result the provider serves for `domain` within `range`.
    async fn search(
        &self,
        credentials: &Credentials,
        domain: &str,
        range: DateRange,
    ) -> customsearch_client::Result<Vec<SearchItem>>;
}

#[async_trait]
impl SiteSearcher for CustomSearchClient {
    async fn search(
        &self,
        credentials: &Credentials,
        domain: &str,
        range: DateRange,
    ) -> customsearch_client::Result<Vec<SearchItem>> {
        self.search_site(Some(credentials), domain, range).await
    }
}
