use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use customsearch_client::SearchItem;

use crate::traits::CrawlStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// Rows actually inserted.
    pub new_pages: usize,
    /// Results the search returned, known or not.
    pub total_found: usize,
}

/// Record the results a site has not seen before as unread pages.
///
/// Known URLs and repeats within the batch are skipped. An insert that loses a
/// race on `(site_id, url)` is dropped without counting. Nothing is ever removed.
pub async fn ingest(
    store: &dyn CrawlStore,
    site_id: Uuid,
    results: &[SearchItem],
) -> Result<IngestOutcome> {
    let mut seen = store.known_urls(site_id).await?;
    let discovered_at = Utc::now();
    let mut new_pages = 0;

    for item in fresh_results(&mut seen, results) {
        if store
            .insert_page(site_id, &item.link, &item.title, discovered_at)
            .await?
        {
            new_pages += 1;
        } else {
            debug!(%site_id, url = item.link.as_str(), "Page already recorded, skipping");
        }
    }

    Ok(IngestOutcome {
        new_pages,
        total_found: results.len(),
    })
}

/// Results whose link is not in `seen`, first occurrence wins. `seen` grows
/// as links are accepted.
fn fresh_results<'a>(
    seen: &mut HashSet<String>,
    results: &'a [SearchItem],
) -> Vec<&'a SearchItem> {
    results
        .iter()
        .filter(|item| seen.insert(item.link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str, title: &str) -> SearchItem {
        SearchItem {
            title: title.to_string(),
            link: link.to_string(),
        }
    }

    #[test]
    fn known_links_are_filtered_out() {
        let mut seen: HashSet<String> = ["https://a.com/old".to_string()].into();
        let results = vec![item("https://a.com/old", "Old"), item("https://a.com/new", "New")];

        let fresh = fresh_results(&mut seen, &results);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].link, "https://a.com/new");
    }

    #[test]
    fn duplicate_links_in_batch_keep_first() {
        let mut seen = HashSet::new();
        let results = vec![
            item("https://a.com/x", "First"),
            item("https://a.com/x", "Second"),
            item("https://a.com/y", "Other"),
        ];

        let fresh = fresh_results(&mut seen, &results);
        let titles: Vec<&str> = fresh.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Other"]);
    }
}
