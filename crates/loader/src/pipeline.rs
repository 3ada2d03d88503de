use crate::error::LoadError;
use crate::executor::BatchExecutor;
use crate::normalizer::Normalizer;
use crate::outcome::BatchSummary;
use crate::parent::insert_parent;
use crate::partition::partition;
use api_client::NavSource;
use configuration::LoadConfig;
use core_types::{FundDocument, FundId, NewFund};
use database::FundStore;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What a completed run did.
#[derive(Debug)]
pub struct LoadReport {
    pub fund_id: FundId,
    /// Records present in the source document.
    pub records_received: usize,
    /// Records dropped by the normalizer under the skip policy.
    pub records_skipped: usize,
    pub batches: BatchSummary,
    pub timings: LoadTimings,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadTimings {
    pub fetch: Duration,
    pub parent_insert: Duration,
    pub batch_insert: Duration,
}

impl LoadTimings {
    pub fn total(&self) -> Duration {
        self.fetch + self.parent_insert + self.batch_insert
    }
}

impl LoadReport {
    /// True only when every batch committed.
    pub fn is_success(&self) -> bool {
        self.batches.is_success()
    }
}

/// The fetch → normalize → parent → batches pipeline for one fund.
pub struct LoadPipeline {
    source: Arc<dyn NavSource>,
    store: Arc<dyn FundStore>,
    normalizer: Normalizer,
    batch_size: NonZeroUsize,
    concurrency: NonZeroUsize,
    cancel: CancellationToken,
}

impl LoadPipeline {
    /// Builds a pipeline, rejecting a zero batch size or concurrency up front.
    pub fn new(config: &LoadConfig, source: Arc<dyn NavSource>, store: Arc<dyn FundStore>) -> Result<Self, LoadError> {
        Ok(Self {
            source,
            store,
            normalizer: Normalizer::new(config.on_bad_date, config.nav_parsing),
            batch_size: config.batch_size()?,
            concurrency: config.concurrency()?,
            cancel: CancellationToken::new(),
        })
    }

    /// Uses `cancel` to stop dispatching batches.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches one scheme from the source and loads it.
    pub async fn run(&self, scheme_code: i64) -> Result<LoadReport, LoadError> {
        let started = Instant::now();
        let document = self.source.fetch_scheme(scheme_code).await?;
        let fetch = started.elapsed();

        let mut report = self.load_document(document).await?;
        report.timings.fetch = fetch;
        Ok(report)
    }

    /// Loads an already fetched document.
    ///
    /// Records are validated before anything is written, so a fatal parse error
    /// leaves the store untouched. The fund is committed before the first batch
    /// is dispatched.
    pub async fn load_document(&self, document: FundDocument) -> Result<LoadReport, LoadError> {
        let records_received = document.data.len();
        let normalized = self.normalizer.normalize(&document.data)?;
        let records_skipped = normalized.skipped;

        let started = Instant::now();
        let fund = NewFund::from(document.meta);
        let fund_id = insert_parent(self.store.as_ref(), &fund).await?;
        let parent_insert = started.elapsed();

        let batches = partition(normalized.bind(fund_id), self.batch_size);
        info!(
            fund_id,
            records = records_received - records_skipped,
            batches = batches.len(),
            batch_size = self.batch_size.get(),
            concurrency = self.concurrency.get(),
            "Inserting NAV records"
        );

        let executor = BatchExecutor::new(
            Arc::clone(&self.store),
            Arc::new(Semaphore::new(self.concurrency.get())),
            self.cancel.clone(),
        );

        let started = Instant::now();
        let summary = executor.execute(batches).await;
        let batch_insert = started.elapsed();

        let report = LoadReport {
            fund_id,
            records_received,
            records_skipped,
            batches: summary,
            timings: LoadTimings {
                fetch: Duration::ZERO,
                parent_insert,
                batch_insert,
            },
        };
        log_report(&report);
        Ok(report)
    }
}

fn log_report(report: &LoadReport) {
    let batches = &report.batches;
    if report.is_success() {
        info!(
            fund_id = report.fund_id,
            batches = batches.total_batches,
            rows = batches.rows_committed(),
            "Data inserted successfully"
        );
        return;
    }

    for failed in &batches.failed {
        error!(range = %failed.range, error = %failed.error, "Batch not persisted");
    }
    warn!(
        fund_id = report.fund_id,
        committed = batches.committed_count(),
        failed = batches.failed_count(),
        skipped = batches.skipped_count(),
        rows = batches.rows_committed(),
        "Load finished with partial persistence"
    );
}
