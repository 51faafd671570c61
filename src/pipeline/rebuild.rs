// src/pipeline/rebuild.rs

//! Rebuild loop: crawl into the inactive slot, then promote it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{SchedulerConfig, Slot};
use crate::pipeline::crawl::{CrawlReport, Crawler};
use crate::storage::{SlotStores, SlotSwitch};

/// Outcome of one completed pass.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub schedule: String,
    /// Slot readers used while the pass ran
    pub source: Slot,
    /// Slot that was rebuilt and is now active
    pub target: Slot,
    pub report: CrawlReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Owns the crawler and the slot switch of one schedule.
pub struct Rebuilder {
    schedule: String,
    crawler: Crawler,
    switch: SlotSwitch,
    stores: SlotStores,
    root: Url,
}

impl Rebuilder {
    pub fn new(crawler: Crawler, switch: SlotSwitch, stores: SlotStores, root: Url) -> Self {
        Self {
            schedule: "default".to_string(),
            crawler,
            switch,
            stores,
            root,
        }
    }

    /// Name used in logs and summaries.
    pub fn with_schedule_name(mut self, name: impl Into<String>) -> Self {
        self.schedule = name.into();
        self
    }

    /// Rebuild the inactive slot from scratch and flip to it.
    ///
    /// The switch is left untouched if the crawl fails.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let started_at = Utc::now();
        let target = self.switch.inactive_slot().await?;
        let source = target.complement();
        log::info!(
            "[{}] Starting pass: rebuilding slot {target} while {source} serves reads",
            self.schedule
        );

        let store = self.stores.get(target);
        store.reset().await?;
        let report = self.crawler.crawl(&self.root, store).await?;

        let target = self.switch.flip_slot(source).await?;
        let finished_at = Utc::now();
        log::info!(
            "[{}] Pass complete in {}s: slot {target} is active",
            self.schedule,
            (finished_at - started_at).num_seconds()
        );

        Ok(PassSummary {
            schedule: self.schedule.clone(),
            source,
            target,
            report,
            started_at,
            finished_at,
        })
    }
}

/// Run one pass per schedule, in order, per the scheduler settings.
///
/// With looping disabled every schedule gets a single pass and the first
/// error is returned once all have been tried. When looping, failed passes
/// are logged and retried after the interval. A switch conflict always
/// stops immediately.
pub async fn run_all(rebuilders: &[Rebuilder], scheduler: &SchedulerConfig) -> Result<()> {
    let interval = Duration::from_secs(scheduler.interval_minutes.saturating_mul(60));
    loop {
        let mut first_error = None;
        for rebuilder in rebuilders {
            match rebuilder.run_pass().await {
                Ok(summary) => log::info!(
                    "[{}] Slot {} -> {}: {} records, {} failures",
                    summary.schedule,
                    summary.source,
                    summary.target,
                    summary.report.inserted,
                    summary.report.fetch_failures + summary.report.insert_failures
                ),
                Err(e @ AppError::SwitchConflict { .. }) => {
                    log::error!("[{}] Stopping: {e}", rebuilder.schedule);
                    return Err(e);
                }
                Err(e) => {
                    log::error!("[{}] Pass failed: {e}", rebuilder.schedule);
                    first_error.get_or_insert(e);
                }
            }
        }

        if !scheduler.loop_enabled {
            return first_error.map_or(Ok(()), Err);
        }
        log::info!("Next pass in {} minutes", scheduler.interval_minutes);
        tokio::time::sleep(interval).await;
    }
}
