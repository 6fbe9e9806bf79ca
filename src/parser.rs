//! Duplication metrics parsing
//!
//! Scans log sources for MarkDuplicates runs, merges the library rows of each
//! run into one record per sample and assembles the final report.

use crate::aggregate::LibraryAggregator;
use crate::config::ModuleConfig;
use crate::derived;
use crate::detector::BlockDetector;
use crate::naming::{SampleFilter, SampleNameCleaner};
use crate::output::{DataFileWriter, DataSourceRegistry};
use crate::reporting::{DuplicationReport, DuplicationReporter};
use crate::sources::LogSource;
use crate::table::{is_table_header, TableParser};
use crate::validation;
use crate::{Batch, SampleRecord};
use anyhow::Result;
use log::{debug, info, warn};

/// Section name used for data source attribution
pub const DATA_SOURCE_SECTION: &str = "DuplicationMetrics";

/// External services the parser reports to
pub struct Collaborators<'a> {
    pub cleaner: &'a dyn SampleNameCleaner,
    pub registry: &'a mut dyn DataSourceRegistry,
    pub filter: &'a dyn SampleFilter,
    pub writer: &'a mut dyn DataFileWriter,
}

/// Owns the batch while sources are scanned
pub struct BatchBuilder<'a> {
    cleaner: &'a dyn SampleNameCleaner,
    registry: &'a mut dyn DataSourceRegistry,
    batch: Batch,
}

impl<'a> BatchBuilder<'a> {
    pub fn new(
        cleaner: &'a dyn SampleNameCleaner,
        registry: &'a mut dyn DataSourceRegistry,
    ) -> Self {
        Self {
            cleaner,
            registry,
            batch: Batch::new(),
        }
    }

    /// Scan one source to its end, adding each valid run to the batch
    pub fn scan_source(&mut self, source: LogSource) {
        let (hint, info, lines) = source.into_lines();
        let display = info.display_path();
        let mut detector = BlockDetector::new(self.cleaner, &info.root, &hint);
        let mut lines = lines.peekable();
        let mut tables = 0usize;

        while let Some(line) = lines.next() {
            detector.observe(&line.content);
            let s_name = match detector.active_sample() {
                Some(s_name) if is_table_header(&line.content) => s_name.to_string(),
                _ => continue,
            };

            if self.batch.contains_key(&s_name) {
                warn!("Duplicate sample name found in {}! Overwriting: {}", display, s_name);
            }
            self.registry
                .add_data_source(&info, &s_name, DATA_SOURCE_SECTION);

            let parser = TableParser::from_header(&line.content);
            let table = parser.parse_rows(&mut lines);
            debug!(
                "{}:{}: {} library rows for {}",
                display, line.line_number, table.rows_consumed, s_name
            );

            let mut aggregator = LibraryAggregator::new();
            for library in table.libraries {
                aggregator.add_library(library);
            }
            self.finish_run(s_name, aggregator.finish());
            detector.end_run();
            tables += 1;
        }
        info!("Parsed {} duplication metrics table(s) from {}", tables, display);
    }

    /// Validate a completed run and store it under its sample name
    fn finish_run(&mut self, s_name: String, mut record: SampleRecord) {
        // A new run for a sample always supersedes the earlier one
        self.batch.remove(&s_name);

        if !validation::has_examined_reads(&record) {
            warn!("Skipping MarkDuplicates sample '{}' as log contained no reads", s_name);
            return;
        }
        if record.recompute_needed() {
            if let Err(e) = derived::recompute_percent_duplication(&mut record) {
                debug!("Keeping PERCENT_DUPLICATION for {}: {}", s_name, e);
            }
        }
        self.batch.insert(s_name, record);
    }

    /// Apply the empty-record rule and hand back the batch
    pub fn finish(mut self) -> Batch {
        validation::drop_empty_records(&mut self.batch);
        self.batch
    }
}

/// Parse every source, persist the metrics and build the report.
///
/// The derived count fields are added before the data file is written, so the
/// persisted mapping carries them alongside the parsed metrics.
///
/// The report's `sample_count` is zero when no usable logs were found, in
/// which case nothing is written.
pub fn parse_reports<I>(
    sources: I,
    config: &ModuleConfig,
    collaborators: Collaborators<'_>,
) -> Result<DuplicationReport>
where
    I: IntoIterator<Item = LogSource>,
{
    let Collaborators {
        cleaner,
        registry,
        filter,
        writer,
    } = collaborators;

    let mut builder = BatchBuilder::new(cleaner, registry);
    for source in sources {
        builder.scan_source(source);
    }
    let mut batch = filter.ignore_samples(builder.finish());

    for (s_name, record) in batch.iter_mut() {
        for field in derived::add_derived_counts(record) {
            warn!("Could not derive {} for {}", field, s_name);
        }
    }

    if !batch.is_empty() {
        writer.write_data_file(&batch, &config.data_filename)?;
    }

    let report = DuplicationReporter::from_config(config).generate_report(batch);
    info!("{}: found {} reports", config.section_name, report.sample_count);
    Ok(report)
}
