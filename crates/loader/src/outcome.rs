use crate::error::BatchError;
use crate::partition::BatchRange;

/// The result of one dispatched batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub range: BatchRange,
    pub result: Result<u64, BatchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedBatch {
    pub range: BatchRange,
    pub rows: u64,
}

#[derive(Debug)]
pub struct FailedBatch {
    pub range: BatchRange,
    pub error: BatchError,
}

/// Collects outcomes while a run is in progress.
///
/// Owned by the dispatcher; spawned tasks hand their outcome back through the
/// join set, so no lock is involved.
#[derive(Debug)]
pub struct OutcomeCollector {
    total: usize,
    committed: Vec<CommittedBatch>,
    failed: Vec<FailedBatch>,
    skipped: Vec<BatchRange>,
}

impl OutcomeCollector {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            committed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: BatchOutcome) {
        match outcome.result {
            Ok(rows) => self.committed.push(CommittedBatch {
                range: outcome.range,
                rows,
            }),
            Err(error) => self.failed.push(FailedBatch {
                range: outcome.range,
                error,
            }),
        }
    }

    /// Records a batch that was never dispatched.
    pub fn record_skipped(&mut self, range: BatchRange) {
        self.skipped.push(range);
    }

    pub fn reported(&self) -> usize {
        self.committed.len() + self.failed.len() + self.skipped.len()
    }

    pub fn finish(mut self) -> BatchSummary {
        self.committed.sort_by_key(|b| b.range.index);
        self.failed.sort_by_key(|b| b.range.index);
        self.skipped.sort_by_key(|r| r.index);

        debug_assert_eq!(self.reported(), self.total);
        BatchSummary {
            total_batches: self.total,
            committed: self.committed,
            failed: self.failed,
            skipped: self.skipped,
        }
    }
}

/// Final per-batch accounting of a run, each list ordered by batch index.
#[derive(Debug)]
pub struct BatchSummary {
    pub total_batches: usize,
    pub committed: Vec<CommittedBatch>,
    pub failed: Vec<FailedBatch>,
    pub skipped: Vec<BatchRange>,
}

impl BatchSummary {
    /// True only when every batch committed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && self.committed.len() == self.total_batches
    }

    pub fn rows_committed(&self) -> u64 {
        self.committed.iter().map(|b| b.rows).sum()
    }

    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}
