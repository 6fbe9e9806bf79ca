//! Derived duplication statistics
//!
//! Once libraries are summed the per-library `PERCENT_DUPLICATION` no longer
//! describes the sample, so it is recomputed from the totals. Optical
//! duplicates are already counted in `READ_PAIR_DUPLICATES` and do not enter
//! the ratio.

use crate::error::{DupMetricsError, Result};
use crate::{fields, MetricValue, SampleRecord};

fn numeric_field(record: &SampleRecord, field: &str) -> Result<f64> {
    match record.get(field) {
        Some(MetricValue::Number(value)) => Ok(*value),
        Some(MetricValue::Text(text)) => Err(DupMetricsError::NonNumericField {
            field: field.to_string(),
            value: text.clone(),
        }),
        None => Err(DupMetricsError::MissingField {
            field: field.to_string(),
        }),
    }
}

/// Duplication ratio over unpaired reads plus both reads of each pair
pub fn percent_duplication(record: &SampleRecord) -> Result<f64> {
    let unpaired_dups = numeric_field(record, fields::UNPAIRED_READ_DUPLICATES)?;
    let pair_dups = numeric_field(record, fields::READ_PAIR_DUPLICATES)?;
    let unpaired_examined = numeric_field(record, fields::UNPAIRED_READS_EXAMINED)?;
    let pairs_examined = numeric_field(record, fields::READ_PAIRS_EXAMINED)?;

    let denominator = unpaired_examined + pairs_examined * 2.0;
    if denominator == 0.0 {
        return Err(DupMetricsError::ZeroDenominator {
            field: fields::PERCENT_DUPLICATION.to_string(),
        });
    }
    Ok((unpaired_dups + pair_dups * 2.0) / denominator)
}

/// Replace `PERCENT_DUPLICATION` with the ratio of the merged totals.
/// On error the record is left unchanged.
pub fn recompute_percent_duplication(record: &mut SampleRecord) -> Result<f64> {
    let ratio = percent_duplication(record)?;
    record.insert(fields::PERCENT_DUPLICATION, MetricValue::Number(ratio));
    Ok(ratio)
}

/// Derived count fields: (target, minuend, subtrahend)
const DERIVED_COUNTS: [(&str, &str, &str); 3] = [
    (
        fields::UNPAIRED_READ_UNIQUE,
        fields::UNPAIRED_READS_EXAMINED,
        fields::UNPAIRED_READ_DUPLICATES,
    ),
    (
        fields::READ_PAIR_NOT_OPTICAL_DUPLICATES,
        fields::READ_PAIR_DUPLICATES,
        fields::READ_PAIR_OPTICAL_DUPLICATES,
    ),
    (
        fields::READ_PAIR_UNIQUE,
        fields::READ_PAIRS_EXAMINED,
        fields::READ_PAIR_DUPLICATES,
    ),
];

/// Add the bar plot count fields. Returns the fields that could not be
/// derived because a source field was missing or not numeric.
pub fn add_derived_counts(record: &mut SampleRecord) -> Vec<&'static str> {
    let mut skipped = Vec::new();
    for (target, minuend, subtrahend) in DERIVED_COUNTS {
        match (record.number(minuend), record.number(subtrahend)) {
            (Some(a), Some(b)) => record.insert(target, MetricValue::Number(a - b)),
            _ => skipped.push(target),
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: &[(&str, f64)]) -> SampleRecord {
        let mut record = SampleRecord::new();
        for (key, value) in values {
            record.insert(key, MetricValue::Number(*value));
        }
        record
    }

    #[test]
    fn test_percent_duplication_formula() {
        let record = record(&[
            (fields::UNPAIRED_READ_DUPLICATES, 4.0),
            (fields::READ_PAIR_DUPLICATES, 10.0),
            (fields::UNPAIRED_READS_EXAMINED, 40.0),
            (fields::READ_PAIRS_EXAMINED, 100.0),
        ]);
        let ratio = percent_duplication(&record).unwrap();
        assert!((ratio - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_recompute_overwrites_ratio() {
        let mut record = record(&[
            (fields::UNPAIRED_READ_DUPLICATES, 0.0),
            (fields::READ_PAIR_DUPLICATES, 25.0),
            (fields::UNPAIRED_READS_EXAMINED, 0.0),
            (fields::READ_PAIRS_EXAMINED, 100.0),
            (fields::PERCENT_DUPLICATION, 0.9),
        ]);
        recompute_percent_duplication(&mut record).unwrap();
        assert_eq!(record.number(fields::PERCENT_DUPLICATION), Some(0.25));
    }

    #[test]
    fn test_recompute_failure_keeps_value() {
        let mut record = record(&[
            (fields::READ_PAIR_DUPLICATES, 25.0),
            (fields::UNPAIRED_READS_EXAMINED, 0.0),
            (fields::READ_PAIRS_EXAMINED, 100.0),
            (fields::PERCENT_DUPLICATION, 0.9),
        ]);
        let err = recompute_percent_duplication(&mut record).unwrap_err();
        assert!(matches!(err, DupMetricsError::MissingField { .. }));
        assert_eq!(record.number(fields::PERCENT_DUPLICATION), Some(0.9));

        record.insert(fields::UNPAIRED_READ_DUPLICATES, MetricValue::Text("0_x".to_string()));
        let err = recompute_percent_duplication(&mut record).unwrap_err();
        assert!(matches!(err, DupMetricsError::NonNumericField { .. }));
    }

    #[test]
    fn test_zero_denominator() {
        let record = record(&[
            (fields::UNPAIRED_READ_DUPLICATES, 0.0),
            (fields::READ_PAIR_DUPLICATES, 0.0),
            (fields::UNPAIRED_READS_EXAMINED, 0.0),
            (fields::READ_PAIRS_EXAMINED, 0.0),
        ]);
        assert!(matches!(
            percent_duplication(&record),
            Err(DupMetricsError::ZeroDenominator { .. })
        ));
    }

    #[test]
    fn test_derived_counts_partition_totals() {
        let mut record = record(&[
            (fields::UNPAIRED_READS_EXAMINED, 40.0),
            (fields::READ_PAIRS_EXAMINED, 100.0),
            (fields::UNPAIRED_READ_DUPLICATES, 4.0),
            (fields::READ_PAIR_DUPLICATES, 10.0),
            (fields::READ_PAIR_OPTICAL_DUPLICATES, 3.0),
        ]);
        assert!(add_derived_counts(&mut record).is_empty());

        assert_eq!(record.number(fields::UNPAIRED_READ_UNIQUE), Some(36.0));
        assert_eq!(record.number(fields::READ_PAIR_NOT_OPTICAL_DUPLICATES), Some(7.0));
        assert_eq!(record.number(fields::READ_PAIR_UNIQUE), Some(90.0));

        let pairs = record.number(fields::READ_PAIR_UNIQUE).unwrap()
            + record.number(fields::READ_PAIR_NOT_OPTICAL_DUPLICATES).unwrap()
            + record.number(fields::READ_PAIR_OPTICAL_DUPLICATES).unwrap();
        assert_eq!(pairs, 100.0);
    }

    #[test]
    fn test_derived_counts_report_missing_sources() {
        let mut record = record(&[
            (fields::READ_PAIRS_EXAMINED, 100.0),
            (fields::READ_PAIR_DUPLICATES, 10.0),
        ]);
        let skipped = add_derived_counts(&mut record);
        assert_eq!(
            skipped,
            vec![fields::UNPAIRED_READ_UNIQUE, fields::READ_PAIR_NOT_OPTICAL_DUPLICATES]
        );
        assert_eq!(record.number(fields::READ_PAIR_UNIQUE), Some(90.0));
    }
}
