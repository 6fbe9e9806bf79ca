//! Sample naming policy
//!
//! Normalises raw sample names taken from file names or tool arguments, and
//! drops excluded samples from a finished batch.

use crate::config::ModuleConfig;
use crate::Batch;
use anyhow::{Context, Result};
use glob::Pattern;
use log::debug;
use std::path::Path;

/// Turns a raw name (file name or INPUT argument) into a sample identity
pub trait SampleNameCleaner {
    fn clean_s_name(&self, raw: &str, root: &Path) -> String;
}

/// Removes excluded samples from a batch
pub trait SampleFilter {
    fn ignore_samples(&self, batch: Batch) -> Batch;
}

/// Truncates names at known file extensions
#[derive(Debug, Clone)]
pub struct ExtensionCleaner {
    pub extensions: Vec<String>,
    pub prepend_dirs: bool,
}

impl Default for ExtensionCleaner {
    fn default() -> Self {
        Self::from_config(&ModuleConfig::default())
    }
}

impl ExtensionCleaner {
    pub fn new(extensions: Vec<String>, prepend_dirs: bool) -> Self {
        Self {
            extensions,
            prepend_dirs,
        }
    }

    pub fn from_config(config: &ModuleConfig) -> Self {
        Self::new(config.fn_clean_exts.clone(), config.prepend_dirs)
    }
}

impl SampleNameCleaner for ExtensionCleaner {
    fn clean_s_name(&self, raw: &str, root: &Path) -> String {
        let mut name = raw.trim();
        for ext in self.extensions.iter().filter(|e| !e.is_empty()) {
            if let Some(pos) = name.find(ext.as_str()) {
                name = &name[..pos];
            }
        }
        let name = name.trim();
        // Never clean a name away entirely
        let name = if name.is_empty() { raw.trim() } else { name };

        if self.prepend_dirs {
            let dir = root
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|d| !d.is_empty() && *d != ".");
            if let Some(dir) = dir {
                return format!("{} | {}", dir, name);
            }
        }
        name.to_string()
    }
}

/// Drops samples whose names match any shell-style glob pattern
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<Pattern>,
}

impl IgnorePatterns {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Pattern::new(p.as_ref())
                    .with_context(|| format!("Invalid sample ignore pattern: {}", p.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, s_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(s_name))
    }
}

impl SampleFilter for IgnorePatterns {
    fn ignore_samples(&self, batch: Batch) -> Batch {
        batch
            .into_iter()
            .filter(|(s_name, _)| {
                let ignored = self.is_ignored(s_name);
                if ignored {
                    debug!("Ignoring sample '{}'", s_name);
                }
                !ignored
            })
            .collect()
    }
}
