//! Persistence of parsed results
//!
//! Data source attribution and the per-sample metrics data file.

use crate::config::DataFormat;
use crate::sources::SourceInfo;
use crate::Batch;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Records which file each sample's metrics came from
pub trait DataSourceRegistry {
    fn add_data_source(&mut self, source: &SourceInfo, s_name: &str, section: &str);
}

/// Persists the final per-sample metrics
pub trait DataFileWriter {
    fn write_data_file(&mut self, batch: &Batch, filename: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceEntry {
    pub module: String,
    pub section: String,
    pub sample: String,
    pub source: String,
}

/// In-memory data source listing for one module
#[derive(Debug, Clone, Default)]
pub struct DataSources {
    pub module: String,
    pub entries: Vec<DataSourceEntry>,
}

impl DataSources {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            entries: Vec::new(),
        }
    }

    /// Drop entries for samples that did not make it into the results
    pub fn retain_samples(&mut self, batch: &Batch) {
        self.entries.retain(|e| batch.contains_key(&e.sample));
    }

    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = tsv_writer(path)?;
        writer.write_record(["Module", "Section", "Sample Name", "Source"])?;
        for entry in &self.entries {
            writer
                .write_record([&entry.module, &entry.section, &entry.sample, &entry.source])
                .with_context(|| format!("Failed to write data sources: {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write data sources: {}", path.display()))
    }
}

impl DataSourceRegistry for DataSources {
    fn add_data_source(&mut self, source: &SourceInfo, s_name: &str, section: &str) {
        let path = source.display_path();
        // A sample seen again in the same section replaces its earlier source
        self.entries
            .retain(|e| !(e.sample == s_name && e.section == section));
        self.entries.push(DataSourceEntry {
            module: self.module.clone(),
            section: section.to_string(),
            sample: s_name.to_string(),
            source: path,
        });
    }
}

/// Writes data files into a directory
#[derive(Debug, Clone)]
pub struct DirDataWriter {
    pub output_dir: PathBuf,
    pub format: DataFormat,
    written: Vec<PathBuf>,
}

impl DirDataWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P, format: DataFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            written: Vec::new(),
        }
    }

    /// Paths of the files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl DataFileWriter for DirDataWriter {
    fn write_data_file(&mut self, batch: &Batch, filename: &str) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;
        let path = self
            .output_dir
            .join(format!("{}.{}", filename, self.format.extension()));

        match self.format {
            DataFormat::Tsv => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create data file: {}", path.display()))?;
                write_batch_tsv(batch, file)
                    .with_context(|| format!("Failed to write data file: {}", path.display()))?;
            }
            DataFormat::Json => {
                let content = serde_json::to_string_pretty(batch)?;
                std::fs::write(&path, content)
                    .with_context(|| format!("Failed to write data file: {}", path.display()))?;
            }
        }
        self.written.push(path);
        Ok(())
    }
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))
}

/// One row per sample; columns are the union of keys in first-seen order.
/// Missing values are written as empty fields.
pub fn write_batch_tsv<W: Write>(batch: &Batch, out: W) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for record in batch.values() {
        for key in record.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
    writer.write_record(std::iter::once("Sample").chain(columns.iter().copied()))?;
    for (s_name, record) in batch {
        let mut row = vec![s_name.clone()];
        row.extend(columns.iter().map(|column| match record.get(column) {
            Some(value) => value.to_string(),
            None => String::new(),
        }));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetricValue, SampleRecord};
    use tempfile::TempDir;

    fn source(filename: &str) -> SourceInfo {
        SourceInfo {
            filename: filename.to_string(),
            root: PathBuf::from("logs"),
            path: None,
        }
    }

    fn batch() -> Batch {
        let mut s1 = SampleRecord::new();
        s1.insert("LIBRARY", MetricValue::Text("lib1".to_string()));
        s1.insert("READ_PAIRS_EXAMINED", MetricValue::Number(100.0));
        let mut s2 = SampleRecord::new();
        s2.insert("READ_PAIRS_EXAMINED", MetricValue::Number(0.5));
        s2.insert("UNMAPPED_READS", MetricValue::Number(3.0));

        let mut batch = Batch::new();
        batch.insert("S1".to_string(), s1);
        batch.insert("S2".to_string(), s2);
        batch
    }

    #[test]
    fn test_data_sources_last_source_wins() {
        let mut sources = DataSources::new("picard");
        sources.add_data_source(&source("a.txt"), "S1", "DuplicationMetrics");
        sources.add_data_source(&source("b.txt"), "S1", "DuplicationMetrics");
        sources.add_data_source(&source("c.txt"), "S2", "DuplicationMetrics");

        assert_eq!(sources.entries.len(), 2);
        assert_eq!(sources.entries[0].sample, "S1");
        assert!(sources.entries[0].source.ends_with("b.txt"));
    }

    #[test]
    fn test_retain_samples() {
        let mut sources = DataSources::new("picard");
        sources.add_data_source(&source("a.txt"), "gone", "DuplicationMetrics");
        sources.add_data_source(&source("b.txt"), "S1", "DuplicationMetrics");
        sources.retain_samples(&batch());

        assert_eq!(sources.entries.len(), 1);
        assert_eq!(sources.entries[0].sample, "S1");
    }

    fn batch_tsv(batch: &Batch) -> Result<String> {
        let mut out = Vec::new();
        write_batch_tsv(batch, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_batch_tsv_column_union() -> Result<()> {
        let tsv = batch_tsv(&batch())?;
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Sample\tLIBRARY\tREAD_PAIRS_EXAMINED\tUNMAPPED_READS");
        assert_eq!(lines[1], "S1\tlib1\t100\t");
        assert_eq!(lines[2], "S2\t\t0.5\t3");
        Ok(())
    }

    #[test]
    fn test_batch_tsv_quotes_embedded_delimiters() -> Result<()> {
        let mut record = SampleRecord::new();
        record.insert("LIBRARY", MetricValue::Text("lib\t1\nlib2".to_string()));
        let mut batch = Batch::new();
        batch.insert("S1".to_string(), record);

        let tsv = batch_tsv(&batch)?;
        assert_eq!(tsv, "Sample\tLIBRARY\nS1\t\"lib\t1\nlib2\"\n");

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(tsv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().collect::<csv::Result<_>>()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "lib\t1\nlib2");
        Ok(())
    }

    #[test]
    fn test_dir_writer_tsv() -> Result<()> {
        let dir = TempDir::new()?;
        let mut writer = DirDataWriter::new(dir.path(), DataFormat::Tsv);
        writer.write_data_file(&batch(), "multiqc_picard_dups")?;

        let content = std::fs::read_to_string(dir.path().join("multiqc_picard_dups.txt"))?;
        assert_eq!(content, batch_tsv(&batch())?);
        Ok(())
    }

    #[test]
    fn test_dir_writer_json() -> Result<()> {
        let dir = TempDir::new()?;
        let mut writer = DirDataWriter::new(dir.path().join("data"), DataFormat::Json);
        writer.write_data_file(&batch(), "multiqc_picard_dups")?;

        let path = dir.path().join("data").join("multiqc_picard_dups.json");
        assert_eq!(writer.written(), &[path.clone()]);
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(value["S1"]["LIBRARY"], "lib1");
        assert_eq!(value["S2"]["UNMAPPED_READS"], 3.0);
        Ok(())
    }

    #[test]
    fn test_data_sources_tsv() -> Result<()> {
        let dir = TempDir::new()?;
        let mut sources = DataSources::new("picard");
        sources.add_data_source(&source("a.txt"), "S1", "DuplicationMetrics");
        let path = dir.path().join("multiqc_sources.txt");
        sources.write_tsv(&path)?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with("Module\tSection\tSample Name\tSource\n"));
        assert!(content.contains("picard\tDuplicationMetrics\tS1\t"));
        assert_eq!(content.lines().count(), 2);
        Ok(())
    }
}
