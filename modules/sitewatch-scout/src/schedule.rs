use chrono::{DateTime, Utc};

use sitewatch_common::CrawlInterval;

/// Whether a site is due for a scheduled crawl. A site that was never crawled
/// is always due. Unrecognized interval codes behave as `1d`.
pub fn is_due(now: DateTime<Utc>, last_crawled_at: Option<DateTime<Utc>>, interval_code: &str) -> bool {
    match last_crawled_at {
        None => true,
        Some(last) => now - last >= CrawlInterval::from_code_or_default(interval_code).duration(),
    }
}
