//! Multi-sample duplication reporting module
//!
//! Packages retained samples into the general statistics contribution and
//! the stacked bar plot of read categories.

use crate::config::ModuleConfig;
use crate::{fields, Batch};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Bar plot categories, bottom to top
pub const BAR_CATEGORY_KEYS: [&str; 6] = [
    fields::READ_PAIR_UNIQUE,
    fields::UNPAIRED_READ_UNIQUE,
    fields::READ_PAIR_NOT_OPTICAL_DUPLICATES,
    fields::READ_PAIR_OPTICAL_DUPLICATES,
    fields::UNPAIRED_READ_DUPLICATES,
    fields::UNMAPPED_READS,
];

/// Transform applied to a stored value when it is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTransform {
    MultiplyHundred,
}

impl ValueTransform {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            ValueTransform::MultiplyHundred => value * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStatsHeader {
    pub title: String,
    pub description: String,
    pub max: f64,
    pub min: f64,
    pub suffix: String,
    pub scale: String,
    pub modify: ValueTransform,
}

impl GeneralStatsHeader {
    /// Render a stored ratio the way the summary table shows it
    pub fn format_value(&self, value: f64) -> String {
        format!("{:.1}{}", self.modify.apply(value), self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarCategory {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub id: String,
    pub title: String,
    pub ylab: String,
    pub cpswitch_counts_label: String,
    /// Whether the plot opens on counts rather than percentages
    pub cpswitch_c_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub name: String,
    pub anchor: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicationReport {
    pub section: SectionInfo,
    /// Full per-sample metrics
    pub samples: Batch,
    pub general_stats_header: GeneralStatsHeader,
    /// Raw 0-1 duplication ratio per sample
    pub general_stats: BTreeMap<String, BTreeMap<String, f64>>,
    pub categories: Vec<BarCategory>,
    /// Per sample counts aligned with `categories`
    pub bar_data: BTreeMap<String, Vec<Option<f64>>>,
    pub plot_config: PlotConfig,
    pub sample_count: usize,
}

impl DuplicationReport {
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Label for a metric key: underscores to spaces, then title case
pub fn category_label(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Duplication reporter for multi-sample analysis
pub struct DuplicationReporter {
    pub section_name: String,
    pub section_anchor: String,
    pub plot_title: String,
    pub plot_id: String,
}

impl Default for DuplicationReporter {
    fn default() -> Self {
        Self::from_config(&ModuleConfig::default())
    }
}

impl DuplicationReporter {
    pub fn from_config(config: &ModuleConfig) -> Self {
        Self {
            section_name: config.section_name.clone(),
            section_anchor: config.section_anchor.clone(),
            plot_title: config.plot_title.clone(),
            plot_id: config.plot_id.clone(),
        }
    }

    pub fn general_stats_header(&self) -> GeneralStatsHeader {
        GeneralStatsHeader {
            title: "% Dups".to_string(),
            description: format!("{} - Percent Duplication", self.section_name),
            max: 100.0,
            min: 0.0,
            suffix: "%".to_string(),
            scale: "OrRd".to_string(),
            modify: ValueTransform::MultiplyHundred,
        }
    }

    pub fn plot_config(&self) -> PlotConfig {
        PlotConfig {
            id: self.plot_id.clone(),
            title: self.plot_title.clone(),
            ylab: "# Reads".to_string(),
            cpswitch_counts_label: "Number of Reads".to_string(),
            cpswitch_c_active: false,
        }
    }

    pub fn categories() -> Vec<BarCategory> {
        BAR_CATEGORY_KEYS
            .iter()
            .map(|key| BarCategory {
                key: key.to_string(),
                name: category_label(key),
            })
            .collect()
    }

    /// Generate the report for a finalized batch
    pub fn generate_report(&self, samples: Batch) -> DuplicationReport {
        let general_stats = samples
            .iter()
            .filter_map(|(s_name, record)| {
                let ratio = record.number(fields::PERCENT_DUPLICATION)?;
                let mut row = BTreeMap::new();
                row.insert(fields::PERCENT_DUPLICATION.to_string(), ratio);
                Some((s_name.clone(), row))
            })
            .collect();

        let bar_data = samples
            .iter()
            .map(|(s_name, record)| {
                let counts = BAR_CATEGORY_KEYS.iter().map(|key| record.number(key)).collect();
                (s_name.clone(), counts)
            })
            .collect();

        DuplicationReport {
            section: SectionInfo {
                name: self.section_name.clone(),
                anchor: self.section_anchor.clone(),
            },
            sample_count: samples.len(),
            samples,
            general_stats_header: self.general_stats_header(),
            general_stats,
            categories: Self::categories(),
            bar_data,
            plot_config: self.plot_config(),
        }
    }

    /// Export report to JSON
    pub fn export_json<P: AsRef<Path>>(&self, report: &DuplicationReport, path: P) -> Result<()> {
        let json_content = serde_json::to_string_pretty(report)?;
        std::fs::write(path.as_ref(), json_content)
            .with_context(|| format!("Failed to write report: {}", path.as_ref().display()))?;
        Ok(())
    }
}
