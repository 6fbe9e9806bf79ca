//! Sample validation
//!
//! Drops samples without usable data: logs with a table header but no reads,
//! and tables that produced no fields at all.

use crate::{fields, Batch, SampleRecord};
use log::debug;

/// True when at least one examined read count is a number above zero
pub fn has_examined_reads(record: &SampleRecord) -> bool {
    [fields::READ_PAIRS_EXAMINED, fields::UNPAIRED_READS_EXAMINED]
        .iter()
        .any(|key| record.number(key).map_or(false, |n| n > 0.0))
}

/// Remove records with no fields, returning the removed sample names
pub fn drop_empty_records(batch: &mut Batch) -> Vec<String> {
    let empty: Vec<String> = batch
        .iter()
        .filter(|(_, record)| record.is_empty())
        .map(|(s_name, _)| s_name.clone())
        .collect();
    for s_name in &empty {
        batch.remove(s_name);
        debug!("Removing {} as no data parsed", s_name);
    }
    empty
}
