//! Bounded, failure-isolated execution of batch inserts.
//!
//! Every batch runs on its own task and in its own transaction. A counting
//! semaphore admits at most `concurrency` tasks at a time: the dispatcher
//! takes a permit before spawning, the task owns it and releases it when it
//! ends, whatever the exit path. The dispatcher then waits for every task it
//! spawned before returning, so no transaction is left in flight.
//!
//! Progress is reported on an `insert_batches` span, one tick per finished
//! batch. It is drawn as a bar only when a `tracing-indicatif` layer is
//! installed.

use crate::error::BatchError;
use crate::outcome::{BatchOutcome, BatchSummary, OutcomeCollector};
use crate::partition::{Batch, BatchRange};
use database::FundStore;
use futures::FutureExt;
use indicatif::ProgressStyle;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({eta})";

pub struct BatchExecutor {
    store: Arc<dyn FundStore>,
    gate: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl BatchExecutor {
    /// Creates an executor admitting batches through `gate`.
    ///
    /// The number of permits on the semaphore is the concurrency limit.
    /// Cancelling `cancel` stops batches that have not been dispatched yet;
    /// batches already running are left to commit or fail.
    pub fn new(store: Arc<dyn FundStore>, gate: Arc<Semaphore>, cancel: CancellationToken) -> Self {
        Self {
            store,
            gate,
            cancel,
        }
    }

    pub async fn execute(&self, batches: Vec<Batch>) -> BatchSummary {
        let span = info_span!("insert_batches", indicatif.pb_show = true);
        span.pb_set_length(batches.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
            span.pb_set_style(&style.progress_chars("#>-"));
        }

        self.dispatch(batches, span.clone()).instrument(span).await
    }

    async fn dispatch(&self, batches: Vec<Batch>, progress: Span) -> BatchSummary {
        let mut collector = OutcomeCollector::new(batches.len());
        let mut tasks: JoinSet<BatchOutcome> = JoinSet::new();
        let mut in_flight: BTreeMap<usize, BatchRange> = BTreeMap::new();
        let mut pending = batches.into_iter();

        while let Some(batch) = pending.next() {
            // Blocks while every permit is held.
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&self.gate).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                warn!(%batch.range, "Load cancelled; remaining batches will not be dispatched");
                collector.record_skipped(batch.range);
                break;
            };

            let store = Arc::clone(&self.store);
            let progress = progress.clone();
            in_flight.insert(batch.range.index, batch.range);

            tasks.spawn(async move {
                let _permit = permit;
                let range = batch.range;
                let result = run_batch(store.as_ref(), &batch).await;
                progress.pb_inc(1);
                BatchOutcome { range, result }
            });
        }

        for batch in pending {
            collector.record_skipped(batch.range);
        }

        // Barrier: every spawned task reports before the summary is built.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    in_flight.remove(&outcome.range.index);
                    collector.record(outcome);
                }
                Err(e) => error!(error = %e, "Batch task did not complete"),
            }
        }

        // Only reachable if a task was torn down by the runtime.
        for (_, range) in in_flight {
            collector.record(BatchOutcome {
                range,
                result: Err(BatchError::Lost),
            });
        }

        collector.finish()
    }
}

/// Inserts one batch, turning a panic in the store into a batch failure.
async fn run_batch(store: &dyn FundStore, batch: &Batch) -> Result<u64, BatchError> {
    let range = batch.range;
    debug!(%range, rows = range.len(), "Inserting batch");

    let result = match AssertUnwindSafe(store.insert_nav_batch(batch.records()))
        .catch_unwind()
        .await
    {
        Ok(result) => result.map_err(BatchError::from),
        Err(panic) => Err(BatchError::Panicked(panic_message(panic.as_ref()))),
    };

    match &result {
        Ok(rows) => debug!(%range, rows, "Batch committed"),
        Err(e) => error!(%range, error = %e, "Batch failed"),
    }
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use chrono::NaiveDate;
    use core_types::{NewFund, NewNavRecord};
    use database::InMemoryStore;
    use rust_decimal::Decimal;
    use std::num::NonZeroUsize;

    async fn seeded_store() -> (Arc<InMemoryStore>, i64) {
        let store = Arc::new(InMemoryStore::new());
        let fund_id = store
            .insert_fund(&NewFund {
                fund_house: "House".to_string(),
                scheme_type: "Type".to_string(),
                scheme_category: "Category".to_string(),
                scheme_code: 1,
                scheme_name: "Scheme".to_string(),
            })
            .await
            .unwrap();
        (store, fund_id)
    }

    fn records(fund_id: i64, n: usize) -> Vec<NewNavRecord> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| NewNavRecord {
                fund_id,
                date: start + chrono::Days::new(i as u64),
                nav: Decimal::from(i as i64),
            })
            .collect()
    }

    #[tokio::test]
    async fn commits_every_batch() {
        let (store, fund_id) = seeded_store().await;
        let batches = partition(records(fund_id, 25), NonZeroUsize::new(10).unwrap());

        let executor = BatchExecutor::new(store.clone(), Arc::new(Semaphore::new(2)), CancellationToken::new());
        let summary = executor.execute(batches).await;

        assert!(summary.is_success());
        assert_eq!(summary.committed_count(), 3);
        assert_eq!(summary.rows_committed(), 25);
        assert_eq!(store.nav_count(), 25);
    }

    #[tokio::test]
    async fn no_batches_means_nothing_to_do() {
        let (store, _) = seeded_store().await;
        let executor = BatchExecutor::new(store, Arc::new(Semaphore::new(1)), CancellationToken::new());

        let summary = executor.execute(Vec::new()).await;
        assert!(summary.is_success());
        assert_eq!(summary.total_batches, 0);
    }

    #[tokio::test]
    async fn pre_cancelled_run_dispatches_nothing() {
        let (store, fund_id) = seeded_store().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let executor = BatchExecutor::new(store.clone(), Arc::new(Semaphore::new(4)), cancel);
        let summary = executor
            .execute(partition(records(fund_id, 30), NonZeroUsize::new(10).unwrap()))
            .await;

        assert_eq!(summary.skipped_count(), 3);
        assert!(!summary.is_success());
        assert_eq!(store.nav_count(), 0);
    }

    #[tokio::test]
    async fn permits_are_returned_after_the_run() {
        let (store, fund_id) = seeded_store().await;
        let gate = Arc::new(Semaphore::new(3));
        let executor = BatchExecutor::new(store, Arc::clone(&gate), CancellationToken::new());

        executor
            .execute(partition(records(fund_id, 50), NonZeroUsize::new(5).unwrap()))
            .await;
        assert_eq!(gate.available_permits(), 3);
    }

    /// Records the spans created while it is the default subscriber.
    #[derive(Clone, Default)]
    struct SpanLog(Arc<std::sync::Mutex<Vec<(&'static str, bool)>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanLog {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let shows_bar = attrs.metadata().fields().field("indicatif.pb_show").is_some();
            self.0.lock().unwrap().push((attrs.metadata().name(), shows_bar));
        }
    }

    #[tokio::test]
    async fn progress_is_reported_on_a_bar_span() {
        use tracing_indicatif::filter::IndicatifFilter;
        use tracing_indicatif::IndicatifLayer;
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::Layer;

        let spans = SpanLog::default();
        let subscriber = tracing_subscriber::registry()
            .with(spans.clone())
            .with(IndicatifLayer::new().with_filter(IndicatifFilter::new(false)));
        let _default = tracing::subscriber::set_default(subscriber);

        let (store, fund_id) = seeded_store().await;
        let executor = BatchExecutor::new(store, Arc::new(Semaphore::new(2)), CancellationToken::new());
        let summary = executor
            .execute(partition(records(fund_id, 12), NonZeroUsize::new(4).unwrap()))
            .await;

        assert!(summary.is_success());
        let spans = spans.0.lock().unwrap();
        assert_eq!(spans.as_slice(), &[("insert_batches", true)]);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
