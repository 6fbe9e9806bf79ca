//! Library aggregation
//!
//! Folds the library rows of one sample into a single record. Numbers are
//! summed; when either side of a merge is text the values are joined with
//! `_` so a malformed field degrades without failing the batch.

use crate::table::LibraryRecord;
use crate::{MetricValue, SampleRecord};

/// Merge a later library's value into the accumulated one
pub fn merge_values(existing: &MetricValue, incoming: &MetricValue) -> MetricValue {
    match (existing, incoming) {
        (MetricValue::Number(a), MetricValue::Number(b)) => MetricValue::Number(a + b),
        _ => MetricValue::Text(format!("{}_{}", existing, incoming)),
    }
}

#[derive(Debug, Default)]
pub struct LibraryAggregator {
    record: SampleRecord,
}

impl LibraryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_library(&mut self, library: LibraryRecord) {
        for (key, value) in library.fields {
            match self.record.get_mut(&key) {
                Some(existing) => {
                    let merged = merge_values(existing, &value);
                    *existing = merged;
                    self.record.mark_recompute_needed();
                }
                None => self.record.insert(&key, value),
            }
        }
    }

    pub fn finish(self) -> SampleRecord {
        self.record
    }
}
