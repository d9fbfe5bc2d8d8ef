pub mod error;
pub mod types;

pub use error::{CustomSearchError, Result};
pub use types::{site_query, Credentials, DateRange, SearchItem, SearchPage};

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

const BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Results per request. The API rejects anything above 10.
pub const PAGE_SIZE: usize = 10;

/// The API never serves results past this offset.
pub const MAX_RESULTS: usize = 100;

/// Something that can serve one page of results for a query at a 1-based offset.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, credentials: &Credentials, query: &str, start: usize)
        -> Result<SearchPage>;
}

/// Walk result pages from offset 1 until a short page, an empty page, or the
/// 100-result window is exhausted. Any error aborts and drops what was collected.
pub async fn collect_results<S: PageSource + ?Sized>(
    source: &S,
    credentials: &Credentials,
    query: &str,
) -> Result<Vec<SearchItem>> {
    let mut results = Vec::new();
    let mut start = 1;

    while start <= MAX_RESULTS {
        let (items, returned) = match source.fetch_page(credentials, query, start).await? {
            SearchPage::Items { items, returned } => (items, returned),
            SearchPage::Empty => break,
            SearchPage::ProviderError(message) => return Err(CustomSearchError::Provider(message)),
        };

        results.extend(items);

        if returned < PAGE_SIZE {
            break;
        }
        start += PAGE_SIZE;
    }

    Ok(results)
}

pub struct CustomSearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl CustomSearchClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search a domain for pages indexed within `range`, across every page the
    /// provider will serve.
    pub async fn search_site(
        &self,
        credentials: Option<&Credentials>,
        domain: &str,
        range: DateRange,
    ) -> Result<Vec<SearchItem>> {
        let credentials = credentials.ok_or(CustomSearchError::MissingCredentials)?;
        let query = site_query(domain, &range.cutoff_date(Utc::now()));

        tracing::info!(domain, %range, query = %query, "Custom Search site query");
        let results = collect_results(self, credentials, &query).await?;
        tracing::info!(domain, count = results.len(), "Custom Search site query complete");

        Ok(results)
    }
}

impl Default for CustomSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageSource for CustomSearchClient {
    async fn fetch_page(
        &self,
        credentials: &Credentials,
        query: &str,
        start: usize,
    ) -> Result<SearchPage> {
        let num = PAGE_SIZE.to_string();
        let start_param = start.to_string();

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", credentials.api_key()),
                ("cx", credentials.engine_id()),
                ("q", query),
                ("num", num.as_str()),
                ("start", start_param.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let page = SearchPage::from_body(&body);

        if !status.is_success() && !matches!(page, SearchPage::ProviderError(_)) {
            return Ok(SearchPage::ProviderError(format!(
                "Search request failed with status {}",
                status.as_u16()
            )));
        }

        tracing::debug!(start, status = status.as_u16(), "Fetched Custom Search page");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves `total` results in pages of 10, recording every offset asked for.
    struct FakeSource {
        total: usize,
        fail_at: Option<usize>,
        provider_error_at: Option<usize>,
        requested: Mutex<Vec<usize>>,
    }

    impl FakeSource {
        fn with_total(total: usize) -> Self {
            Self {
                total,
                fail_at: None,
                provider_error_at: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<usize> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(
            &self,
            _credentials: &Credentials,
            _query: &str,
            start: usize,
        ) -> Result<SearchPage> {
            self.requested.lock().unwrap().push(start);
            if self.fail_at == Some(start) {
                return Err(CustomSearchError::Network("connection reset".into()));
            }
            if self.provider_error_at == Some(start) {
                return Ok(SearchPage::ProviderError("Daily limit exceeded".into()));
            }
            let first = start - 1;
            if first >= self.total {
                return Ok(SearchPage::Empty);
            }
            let last = (first + PAGE_SIZE).min(self.total);
            let items: Vec<SearchItem> = (first..last)
                .map(|i| SearchItem {
                    title: format!("Result {i}"),
                    link: format!("https://a.com/{i}"),
                })
                .collect();
            let returned = items.len();
            Ok(SearchPage::Items { items, returned })
        }
    }

    fn creds() -> Credentials {
        Credentials::resolve(Some("key"), Some("cx")).unwrap()
    }

    #[tokio::test]
    async fn always_full_provider_stops_at_offset_91() {
        let source = FakeSource::with_total(1_000);
        let results = collect_results(&source, &creds(), "site:a.com").await.unwrap();

        assert_eq!(source.requested(), vec![1, 11, 21, 31, 41, 51, 61, 71, 81, 91]);
        assert_eq!(results.len(), 100);
    }

    #[tokio::test]
    async fn short_page_ends_paging() {
        let source = FakeSource::with_total(23);
        let results = collect_results(&source, &creds(), "q").await.unwrap();

        assert_eq!(source.requested(), vec![1, 11, 21]);
        assert_eq!(results.len(), 23);
        assert_eq!(results[0].link, "https://a.com/0");
        assert_eq!(results[22].link, "https://a.com/22");
    }

    #[tokio::test]
    async fn empty_page_after_full_page_ends_paging() {
        let source = FakeSource::with_total(20);
        let results = collect_results(&source, &creds(), "q").await.unwrap();

        assert_eq!(source.requested(), vec![1, 11, 21]);
        assert_eq!(results.len(), 20);
    }

    #[tokio::test]
    async fn network_failure_discards_partial_results() {
        let mut source = FakeSource::with_total(50);
        source.fail_at = Some(21);

        let err = collect_results(&source, &creds(), "q").await.unwrap_err();
        assert!(matches!(err, CustomSearchError::Network(_)));
        assert_eq!(source.requested(), vec![1, 11, 21]);
    }

    #[tokio::test]
    async fn provider_error_message_is_propagated_verbatim() {
        let mut source = FakeSource::with_total(50);
        source.provider_error_at = Some(11);

        let err = collect_results(&source, &creds(), "q").await.unwrap_err();
        assert_eq!(err.to_string(), "Daily limit exceeded");
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let client = CustomSearchClient::with_base_url("http://127.0.0.1:9");
        let err = client
            .search_site(None, "a.com", DateRange::Week)
            .await
            .unwrap_err();
        assert!(matches!(err, CustomSearchError::MissingCredentials));
    }
}
