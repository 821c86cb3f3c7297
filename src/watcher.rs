use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::differ::diff_snapshots;
use crate::extractor::{ExtractionReport, ProductExtractor};
use crate::models::{ChangeSet, Snapshot};
use crate::notifier::{DeliveryReport, Notifier};
use crate::plugins::notifiers::{build_channel, StdoutChannel};
use crate::scraper::{build_fetcher, PageFetcher};
use crate::store::{JsonFileStore, SnapshotStore};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Fetching,
    Extracting,
    Diffing,
    Notifying,
    Saving,
    Done,
    Aborted,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Fetching, Extracting)
                | (Fetching, Aborted)
                | (Extracting, Diffing)
                | (Extracting, Aborted)
                | (Diffing, Notifying)
                | (Notifying, Saving)
                | (Saving, Done)
                | (Saving, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted | RunState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Fetching => "fetching",
            RunState::Extracting => "extracting",
            RunState::Diffing => "diffing",
            RunState::Notifying => "notifying",
            RunState::Saving => "saving",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Announce every product when there is no previous snapshot.
    pub announce_first_run: bool,
    /// Write the new snapshot at the end of the run. Off for dry runs.
    pub persist: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            announce_first_run: false,
            persist: true,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trail: Vec<RunState>,
    pub listings_found: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub changes: ChangeSet,
    /// No previous snapshot and first-run announcements are off.
    pub baseline: bool,
    pub delivery: DeliveryReport,
    pub elapsed_ms: u64,
    pub error: Option<AppError>,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            trail: vec![RunState::Idle],
            listings_found: 0,
            extracted: 0,
            skipped: 0,
            changes: ChangeSet::default(),
            baseline: false,
            delivery: DeliveryReport::default(),
            elapsed_ms: 0,
            error: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.trail.last().copied().unwrap_or(RunState::Idle)
    }

    pub fn is_success(&self) -> bool {
        self.state() == RunState::Done
    }

    /// Process exit status: 0 when the run is done, otherwise the error's code.
    pub fn exit_code(&self) -> u8 {
        match &self.error {
            Some(e) => e.exit_code(),
            None if self.is_success() => 0,
            None => 1,
        }
    }

    fn advance(&mut self, next: RunState) {
        let current = self.state();
        debug_assert!(current.can_transition_to(next), "invalid transition {} -> {}", current, next);
        tracing::debug!(from = %current, to = %next, "run state");
        self.trail.push(next);
    }

    fn record_extraction(&mut self, extraction: &ExtractionReport) {
        self.listings_found = extraction.listings_found;
        self.extracted = extraction.products.len();
        self.skipped = extraction.skipped.len();
    }

    fn abort(mut self, error: AppError) -> Self {
        tracing::error!(state = %self.state(), error = %error, "run aborted, snapshot left untouched");
        self.advance(RunState::Aborted);
        metrics::counter!("catalog_watcher_runs_total", "outcome" => "aborted").increment(1);
        self.error = Some(error);
        self
    }
}

/// Sequences one fetch → extract → diff → notify → save cycle.
pub struct Watcher {
    site_url: String,
    fetcher: Box<dyn PageFetcher>,
    extractor: ProductExtractor,
    store: Arc<dyn SnapshotStore>,
    notifier: Notifier,
    options: RunOptions,
}

impl Watcher {
    pub fn new(
        site_url: impl Into<String>,
        fetcher: Box<dyn PageFetcher>,
        extractor: ProductExtractor,
        store: Arc<dyn SnapshotStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            fetcher,
            extractor,
            store,
            notifier,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Wires every part from configuration. A dry run prints messages and keeps the snapshot.
    pub fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let fetcher = build_fetcher(&config.fetcher, &config.site)?;
        let extractor = ProductExtractor::new(&config.site)?;
        let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(&config.storage.state_file));

        let notifier = if dry_run {
            Notifier::new(Arc::new(StdoutChannel::new()), "stdout", &config.site.name)
        } else {
            let channel = build_channel(&config.notifications)?;
            let destination = config.notifications.destination.clone().unwrap_or_default();
            Notifier::new(channel, destination, &config.site.name)
        };

        let options = RunOptions {
            announce_first_run: config.run.announce_first_run,
            persist: !dry_run,
        };

        Ok(Self::new(config.site.url.clone(), fetcher, extractor, store, notifier).with_options(options))
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> RunReport {
        let start_time = Instant::now();
        let mut report = RunReport::new(run_id);
        tracing::info!(url = %self.site_url, channel = self.notifier.channel_name(), "run started");

        report.advance(RunState::Fetching);
        let previous = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => return report.abort(e),
        };
        let html = match self.fetcher.fetch(&self.site_url).await {
            Ok(html) => html,
            Err(e) => return report.abort(e),
        };

        report.advance(RunState::Extracting);
        let extraction = match self.extractor.extract(&html) {
            Ok(extraction) => extraction,
            Err(e) => return report.abort(e),
        };
        report.record_extraction(&extraction);
        metrics::counter!("catalog_watcher_products_extracted_total").increment(report.extracted as u64);
        metrics::counter!("catalog_watcher_listings_skipped_total").increment(report.skipped as u64);

        report.advance(RunState::Diffing);
        let current = Snapshot::from_records(extraction.products).captured_now();
        report.changes = diff_snapshots(&current, &previous);
        report.baseline = previous.is_empty() && !self.options.announce_first_run;
        metrics::counter!("catalog_watcher_changes_total", "kind" => "added").increment(report.changes.added.len() as u64);
        metrics::counter!("catalog_watcher_changes_total", "kind" => "removed").increment(report.changes.removed.len() as u64);
        metrics::counter!("catalog_watcher_changes_total", "kind" => "price_changed")
            .increment(report.changes.price_changed.len() as u64);
        tracing::info!(summary = %report.changes.summary(), "diff results");

        report.advance(RunState::Notifying);
        if report.baseline {
            tracing::info!(products = current.len(), "first run, recording baseline without notifications");
        } else {
            report.delivery = self.notifier.notify(&report.changes).await;
        }

        report.advance(RunState::Saving);
        if self.options.persist {
            if let Err(e) = self.store.save(&current) {
                tracing::error!(error = %e, "failed to save snapshot");
                report.advance(RunState::Failed);
                metrics::counter!("catalog_watcher_runs_total", "outcome" => "failed").increment(1);
                report.error = Some(e);
                report.elapsed_ms = start_time.elapsed().as_millis() as u64;
                return report;
            }
        } else {
            tracing::info!("dry run, snapshot not written");
        }

        report.advance(RunState::Done);
        report.elapsed_ms = start_time.elapsed().as_millis() as u64;
        metrics::counter!("catalog_watcher_runs_total", "outcome" => "done").increment(1);
        tracing::info!(
            extracted = report.extracted,
            skipped = report.skipped,
            sent = report.delivery.sent,
            failed = report.delivery.failed,
            elapsed_ms = report.elapsed_ms,
            "run complete"
        );
        report
    }
}
