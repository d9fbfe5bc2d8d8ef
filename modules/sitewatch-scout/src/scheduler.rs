use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use customsearch_client::DateRange;

use crate::crawler::{CrawlError, Crawler};
use crate::schedule::is_due;

/// How often the scheduler looks for due sites.
pub const TICK_PERIOD: Duration = Duration::from_secs(60);

/// Date range used for every scheduled crawl.
pub const SCHEDULED_RANGE: DateRange = DateRange::Week;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Active sites looked at.
    pub checked: usize,
    /// Sites whose interval had elapsed.
    pub due: usize,
    pub crawled: usize,
    pub failed: usize,
    /// Due sites left alone: no credentials, or already being crawled.
    pub skipped: usize,
}

/// Background loop that crawls every active site whose interval has elapsed.
///
/// Owned by the composition root. Error sites are not retried here; a manual
/// crawl that succeeds puts them back in rotation.
pub struct Scheduler {
    crawler: Arc<Crawler>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Scheduler {
    pub fn new(crawler: Arc<Crawler>) -> Self {
        Self {
            crawler,
            shutdown: Mutex::new(None),
        }
    }

    /// Spawn the tick loop. Returns false if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let Ok(mut shutdown) = self.shutdown.lock() else {
            return false;
        };
        if shutdown.is_some() {
            return false;
        }

        let (tx, mut rx) = watch::channel(false);
        *shutdown = Some(tx);

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            info!(period_secs = TICK_PERIOD.as_secs(), "Scheduler started");
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = scheduler.run_tick(Utc::now()).await;
                        info!(
                            checked = report.checked,
                            due = report.due,
                            crawled = report.crawled,
                            failed = report.failed,
                            skipped = report.skipped,
                            "Scheduler tick complete"
                        );
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Scheduler stopped");
        });

        true
    }

    /// Ask the loop to exit after its current tick. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let Ok(mut shutdown) = self.shutdown.lock() else {
            return false;
        };
        match shutdown.take() {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown
            .lock()
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    /// One pass: crawl every due active site, one at a time.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let sites = match self.crawler.store().active_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                error!(error = %e, "Scheduler: failed to list sites");
                return report;
            }
        };
        report.checked = sites.len();

        let due: Vec<_> = sites
            .iter()
            .filter(|s| is_due(now, s.last_crawled_at, &s.crawl_interval))
            .collect();
        report.due = due.len();

        // Credentials are resolved per site so a key saved mid-tick is picked up.
        for site in due {
            match self.crawler.crawl_site(site, SCHEDULED_RANGE).await {
                Ok(_) => report.crawled += 1,
                Err(CrawlError::AlreadyRunning(_)) => {
                    info!(domain = site.domain.as_str(), "Scheduler: crawl already running, skipping");
                    report.skipped += 1;
                }
                Err(CrawlError::Config(message)) => {
                    warn!(domain = site.domain.as_str(), error = %message, "Scheduler: search API not configured, skipping");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(domain = site.domain.as_str(), error = %e, "Scheduler: crawl failed");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
