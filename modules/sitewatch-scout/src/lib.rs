//! Crawl pipeline: credential resolution, site search, page ingest, status
//! writes, and the background scheduler that drives them.

pub mod crawler;
pub mod credentials;
pub mod ingest;
pub mod schedule;
pub mod scheduler;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use crawler::{CrawlError, CrawlOutcome, Crawler};
pub use credentials::{resolve_credentials, CredentialDefaults};
pub use ingest::{ingest, IngestOutcome};
pub use schedule::is_due;
pub use scheduler::{Scheduler, TickReport, SCHEDULED_RANGE, TICK_PERIOD};
pub use traits::{CrawlStore, PgCrawlStore, SiteSearcher};
