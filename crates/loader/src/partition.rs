use core_types::NewNavRecord;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Position of a batch within the full record sequence: records `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchRange {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inclusive upper bound reads better in logs: "batch 3 (records 3000..=3999)".
        write!(f, "batch {} (records {}..={})", self.index, self.start, self.end.saturating_sub(1))
    }
}

/// A contiguous slice of the record sequence, inserted in one transaction.
///
/// All batches of a run share the same backing allocation, so handing a
/// batch to a spawned task does not copy records.
#[derive(Debug, Clone)]
pub struct Batch {
    pub range: BatchRange,
    records: Arc<[NewNavRecord]>,
}

impl Batch {
    pub fn records(&self) -> &[NewNavRecord] {
        &self.records[self.range.start..self.range.end]
    }
}

/// Splits `total` records into `ceil(total / batch_size)` ordered ranges.
pub fn partition_ranges(total: usize, batch_size: NonZeroUsize) -> Vec<BatchRange> {
    let size = batch_size.get();
    (0..total)
        .step_by(size)
        .enumerate()
        .map(|(index, start)| BatchRange {
            index,
            start,
            end: (start + size).min(total),
        })
        .collect()
}

pub fn partition(records: Vec<NewNavRecord>, batch_size: NonZeroUsize) -> Vec<Batch> {
    let records: Arc<[NewNavRecord]> = records.into();
    partition_ranges(records.len(), batch_size)
        .into_iter()
        .map(|range| Batch {
            range,
            records: Arc::clone(&records),
        })
        .collect()
}
