//! Run detection
//!
//! A run starts on a line mentioning both MarkDuplicates and its INPUT
//! argument, e.g. the metrics file header
//! `# picard.sam.markduplicates.MarkDuplicates INPUT=[S1.bam] OUTPUT=...`.
//! The sample identity comes from the INPUT path.

use crate::naming::SampleNameCleaner;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref INPUT_ARG: Regex = Regex::new(r"(?i)INPUT(?:=|\s+)(\[?[^\s]+\]?)").unwrap();
}

/// Whether the line opens a new run
pub fn is_run_start(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("markduplicates") && lower.contains("input")
}

/// Base name of the INPUT argument, with surrounding brackets removed
pub fn extract_input_name(line: &str) -> Option<String> {
    let captures = INPUT_ARG.captures(line)?;
    let path = captures.get(1)?.as_str().trim_matches(|c| c == '[' || c == ']');
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    NoActiveRun,
    ActiveRun(String),
}

/// Tracks which sample the current lines of one source belong to
pub struct BlockDetector<'a> {
    cleaner: &'a dyn SampleNameCleaner,
    root: &'a Path,
    state: RunState,
}

impl<'a> BlockDetector<'a> {
    /// Lines before the first run are attributed to `hint` when it is non-empty
    pub fn new(cleaner: &'a dyn SampleNameCleaner, root: &'a Path, hint: &str) -> Self {
        let state = if hint.is_empty() {
            RunState::NoActiveRun
        } else {
            RunState::ActiveRun(hint.to_string())
        };
        Self {
            cleaner,
            root,
            state,
        }
    }

    /// Apply the state transition for one line
    pub fn observe(&mut self, line: &str) {
        if !is_run_start(line) {
            return;
        }
        self.state = match extract_input_name(line) {
            Some(raw) => RunState::ActiveRun(self.cleaner.clean_s_name(&raw, self.root)),
            None => RunState::NoActiveRun,
        };
    }

    pub fn active_sample(&self) -> Option<&str> {
        match &self.state {
            RunState::ActiveRun(s_name) => Some(s_name),
            RunState::NoActiveRun => None,
        }
    }

    /// Close the current run once its table has been read
    pub fn end_run(&mut self) {
        self.state = RunState::NoActiveRun;
    }
}
