//! Module configuration
//!
//! Section names, plot identifiers and file discovery settings. The same
//! parser serves Picard MarkDuplicates and biobambam2 bamsormadup output,
//! which only differ in these settings.

use crate::error::{DupMetricsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format used when persisting the parsed metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Tsv,
    Json,
}

impl DataFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DataFormat::Tsv => "txt",
            DataFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub log_key: String,
    pub section_name: String,
    pub section_anchor: String,
    pub plot_title: String,
    pub plot_id: String,
    pub data_filename: String,
    pub data_format: DataFormat,
    /// Text a candidate log must contain within its first `search_lines` lines
    pub search_contents: String,
    pub search_lines: usize,
    /// Sample name suffixes truncated by the name cleaner
    pub fn_clean_exts: Vec<String>,
    pub prepend_dirs: bool,
    /// Glob patterns of sample names to drop from the results
    pub ignore_samples: Vec<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::picard()
    }
}

impl ModuleConfig {
    /// Settings for Picard MarkDuplicates metrics files
    pub fn picard() -> Self {
        Self {
            log_key: "picard/markdups".to_string(),
            section_name: "Mark Duplicates".to_string(),
            section_anchor: "picard-markduplicates".to_string(),
            plot_title: "Picard: Deduplication Stats".to_string(),
            plot_id: "picard_deduplication".to_string(),
            data_filename: "multiqc_picard_dups".to_string(),
            data_format: DataFormat::Tsv,
            search_contents: "MarkDuplicates".to_string(),
            search_lines: 100,
            fn_clean_exts: default_clean_exts(),
            prepend_dirs: false,
            ignore_samples: Vec::new(),
        }
    }

    /// Settings for biobambam2 bamsormadup metrics files
    pub fn biobambam2() -> Self {
        Self {
            log_key: "biobambam2/bamsormadup".to_string(),
            section_name: "bamsormadup".to_string(),
            section_anchor: "biobambam2-bamsormadup".to_string(),
            plot_title: "biobambam2: bamsormadup deduplication stats".to_string(),
            plot_id: "biobambam2_bamsormadup_plot".to_string(),
            data_filename: "bamsormadup_bamsormadup".to_string(),
            search_contents: "# bamsormadup".to_string(),
            ..Self::picard()
        }
    }

    /// Look up a preset by tool name
    pub fn for_tool(tool: &str) -> Option<Self> {
        match tool.to_lowercase().as_str() {
            "picard" | "markduplicates" => Some(Self::picard()),
            "biobambam2" | "bamsormadup" => Some(Self::biobambam2()),
            _ => None,
        }
    }

    /// Overlay a JSON configuration file on the defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DupMetricsError::InvalidConfig {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content).map_err(|e| match e {
            DupMetricsError::InvalidConfig { reason, .. } => DupMetricsError::InvalidConfig {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| DupMetricsError::InvalidConfig {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.data_filename.trim().is_empty() {
            return Err(DupMetricsError::InvalidConfig {
                path: "<inline>".to_string(),
                reason: "data_filename must not be empty".to_string(),
            });
        }
        if self.search_lines == 0 {
            return Err(DupMetricsError::InvalidConfig {
                path: "<inline>".to_string(),
                reason: "search_lines must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// File name suffixes stripped from sample names
fn default_clean_exts() -> Vec<String> {
    [
        ".gz", ".fastq", ".fq", ".bam", ".sam", ".cram", ".log", ".stderr", ".out", ".txt",
        ".tsv", ".csv", ".metrics", ".aligned", ".merge", ".deduplicated", ".dedup", ".dups",
        ".markdup", ".markdups", ".sorted", ".report", "_duplicate_metrics", "_markdup",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}
