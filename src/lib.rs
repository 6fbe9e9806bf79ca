//! MarkDups QC
//!
//! Duplication metrics aggregation for Picard MarkDuplicates and biobambam2
//! bamsormadup logs.
//!
//! This library provides shared functionality for:
//! - Detecting metrics runs in free-form tool logs
//! - Parsing tab-delimited duplication metrics tables
//! - Merging per-library rows into one record per sample
//! - Recomputing duplication ratios and bar plot counts
//! - Multi-sample duplication reporting

pub mod aggregate;
pub mod config;
pub mod derived;
pub mod detector;
pub mod error;
pub mod naming;
pub mod output;
pub mod parser;
pub mod reporting;
pub mod sources;
pub mod table;
pub mod validation;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Metric keys used by the duplication metrics table
pub mod fields {
    pub const LIBRARY: &str = "LIBRARY";
    pub const UNPAIRED_READS_EXAMINED: &str = "UNPAIRED_READS_EXAMINED";
    pub const READ_PAIRS_EXAMINED: &str = "READ_PAIRS_EXAMINED";
    pub const UNMAPPED_READS: &str = "UNMAPPED_READS";
    pub const UNPAIRED_READ_DUPLICATES: &str = "UNPAIRED_READ_DUPLICATES";
    pub const READ_PAIR_DUPLICATES: &str = "READ_PAIR_DUPLICATES";
    pub const READ_PAIR_OPTICAL_DUPLICATES: &str = "READ_PAIR_OPTICAL_DUPLICATES";
    pub const PERCENT_DUPLICATION: &str = "PERCENT_DUPLICATION";

    // Derived after validation
    pub const UNPAIRED_READ_UNIQUE: &str = "UNPAIRED_READ_UNIQUE";
    pub const READ_PAIR_NOT_OPTICAL_DUPLICATES: &str = "READ_PAIR_NOT_OPTICAL_DUPLICATES";
    pub const READ_PAIR_UNIQUE: &str = "READ_PAIR_UNIQUE";
}

/// A single metric value: numeric when the raw field parses as a float
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Coerce a raw table field, keeping it as text when it is not a number
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) => MetricValue::Number(value),
            Err(_) => MetricValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(value) => Some(*value),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(value) => write!(f, "{}", value),
            MetricValue::Text(text) => f.write_str(text),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(value) => serializer.serialize_f64(*value),
            MetricValue::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// Accumulated metrics for one sample, in table header order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleRecord {
    fields: Vec<(String, MetricValue)>,
    recompute_needed: bool,
}

impl SampleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MetricValue> {
        self.fields.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Numeric value of a field, `None` when absent or text
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetricValue::as_number)
    }

    /// Insert or replace a field; new keys keep their arrival position
    pub fn insert(&mut self, key: &str, value: MetricValue) {
        match self.get_mut(key) {
            Some(slot) => *slot = value,
            None => self.fields.push((key.to_string(), value)),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Set when more than one library contributed to this record
    pub fn recompute_needed(&self) -> bool {
        self.recompute_needed
    }

    pub fn mark_recompute_needed(&mut self) {
        self.recompute_needed = true;
    }
}

impl Serialize for SampleRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Per-sample records for one pass over a log corpus
pub type Batch = BTreeMap<String, SampleRecord>;
