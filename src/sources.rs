//! Log sources and discovery
//!
//! A log source is one file (or in-memory text) read line by line in order.
//! Discovery walks an input directory and keeps files that look like
//! duplication metrics output.

use crate::config::ModuleConfig;
use crate::naming::SampleNameCleaner;
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Identity of the file a line came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub filename: String,
    pub root: PathBuf,
    pub path: Option<PathBuf>,
}

impl SourceInfo {
    /// Path shown in messages and the data source listing
    pub fn display_path(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => self.root.join(&self.filename).display().to_string(),
        }
    }
}

/// One line of a log, with its 1-based position in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub content: String,
    pub line_number: usize,
}

impl AsRef<str> for LogLine {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

type RawLines = Box<dyn Iterator<Item = io::Result<String>>>;

/// Where a source's lines come from. Files are only opened when scanned.
enum LineOrigin {
    File(PathBuf),
    Reader(RawLines),
}

pub struct LogSource {
    /// Sample name derived from the file name, used until a run names its input
    pub s_name: String,
    pub info: SourceInfo,
    origin: LineOrigin,
}

impl std::fmt::Debug for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSource")
            .field("s_name", &self.s_name)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl LogSource {
    pub fn from_reader<R: BufRead + 'static>(
        s_name: impl Into<String>,
        info: SourceInfo,
        reader: R,
    ) -> Self {
        Self {
            s_name: s_name.into(),
            info,
            origin: LineOrigin::Reader(Box::new(reader.lines())),
        }
    }

    /// In-memory source, mostly useful for tests
    pub fn from_text(s_name: &str, filename: &str, text: &str) -> Self {
        let info = SourceInfo {
            filename: filename.to_string(),
            root: PathBuf::from("."),
            path: None,
        };
        Self::from_reader(s_name, info, Cursor::new(text.to_string().into_bytes()))
    }

    /// Source backed by a file. Nothing is opened until `into_lines`, so any
    /// number of sources can be held at once.
    pub fn open<P: AsRef<Path>>(path: P, cleaner: &dyn SampleNameCleaner) -> Self {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let s_name = cleaner.clean_s_name(&filename, &root);
        let info = SourceInfo {
            filename,
            root,
            path: Some(path.to_path_buf()),
        };
        Self {
            s_name,
            info,
            origin: LineOrigin::File(path.to_path_buf()),
        }
    }

    /// Numbered lines, ending early with a warning on a read error. A file
    /// that can no longer be opened yields no lines.
    pub fn into_lines(self) -> (String, SourceInfo, impl Iterator<Item = LogLine>) {
        let display = self.info.display_path();
        let raw: RawLines = match self.origin {
            LineOrigin::Reader(lines) => lines,
            LineOrigin::File(path) => match File::open(&path) {
                Ok(file) => Box::new(BufReader::new(file).lines()),
                Err(e) => {
                    warn!("Could not open {}: {}", path.display(), e);
                    Box::new(std::iter::empty())
                }
            },
        };
        let lines = raw
            .map_while(move |line| match line {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!("Stopped reading {}: {}", display, e);
                    None
                }
            })
            .enumerate()
            .map(|(i, content)| LogLine {
                content,
                line_number: i + 1,
            });
        (self.s_name, self.info, lines)
    }
}

/// Find candidate log files below `input_dir`, in sorted path order
pub fn find_log_files<P: AsRef<Path>>(
    input_dir: P,
    config: &ModuleConfig,
    cleaner: &dyn SampleNameCleaner,
) -> Result<Vec<LogSource>> {
    let input_dir = input_dir.as_ref();
    let dir = input_dir
        .to_str()
        .with_context(|| format!("Input path is not valid UTF-8: {}", input_dir.display()))?;
    // Directory names may contain glob metacharacters
    let pattern = PathBuf::from(Pattern::escape(dir)).join("**").join("*");
    let pattern = pattern.to_string_lossy();

    let mut paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Invalid search pattern: {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut sources = Vec::new();
    for path in paths {
        if !matches_contents(&path, &config.search_contents, config.search_lines) {
            continue;
        }
        debug!("Found {} log: {}", config.log_key, path.display());
        sources.push(LogSource::open(&path, cleaner));
    }
    Ok(sources)
}

/// Whether any of the first `max_lines` lines contains `needle`
fn matches_contents(path: &Path, needle: &str, max_lines: usize) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Could not open {}: {}", path.display(), e);
            return false;
        }
    };
    // Binary files fail UTF-8 decoding and end the search
    BufReader::new(file)
        .lines()
        .take(max_lines)
        .map_while(|line| line.ok())
        .any(|line| line.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::ExtensionCleaner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_text_numbers_lines() {
        let source = LogSource::from_text("S1", "S1.txt", "first\nsecond\n");
        let (s_name, info, lines) = source.into_lines();
        let lines: Vec<LogLine> = lines.collect();

        assert_eq!(s_name, "S1");
        assert_eq!(info.filename, "S1.txt");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "second");
        assert_eq!(lines[1].line_number, 2);
    }

    #[test]
    fn test_find_log_files_filters_by_contents() -> Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(
            dir.path().join("nested").join("S2.dups.txt"),
            "## htsjdk.samtools.metrics.StringHeader\n# MarkDuplicates INPUT=[S2.bam]\n",
        )?;
        fs::write(dir.path().join("S1.dups.txt"), "# MarkDuplicates INPUT=S1.bam\n")?;
        fs::write(dir.path().join("other.txt"), "nothing to see\n")?;

        let cleaner = ExtensionCleaner::default();
        let sources = find_log_files(dir.path(), &ModuleConfig::default(), &cleaner)?;
        let names: Vec<&str> = sources.iter().map(|s| s.s_name.as_str()).collect();

        assert_eq!(names, vec!["S1", "S2"]);
        assert_eq!(sources[0].info.filename, "S1.dups.txt");
        Ok(())
    }

    #[test]
    fn test_find_log_files_respects_search_lines() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("late.txt"), "a\nb\nc\nMarkDuplicates\n")?;

        let config = ModuleConfig {
            search_lines: 2,
            ..ModuleConfig::default()
        };
        let sources = find_log_files(dir.path(), &config, &ExtensionCleaner::default())?;
        assert!(sources.is_empty());
        Ok(())
    }

    #[test]
    fn test_find_log_files_escapes_input_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let run_dir = dir.path().join("run[1]*");
        fs::create_dir(&run_dir)?;
        fs::write(run_dir.join("S1.txt"), "# MarkDuplicates INPUT=S1.bam\n")?;
        fs::create_dir(dir.path().join("run1"))?;
        fs::write(dir.path().join("run1").join("S2.txt"), "# MarkDuplicates INPUT=S2.bam\n")?;

        let sources = find_log_files(&run_dir, &ModuleConfig::default(), &ExtensionCleaner::default())?;
        let names: Vec<&str> = sources.iter().map(|s| s.s_name.as_str()).collect();
        assert_eq!(names, vec!["S1"]);
        Ok(())
    }

    #[test]
    fn test_discovered_sources_hold_no_open_files() -> Result<()> {
        // More candidates than a typical open file limit
        let dir = TempDir::new()?;
        for i in 0..1500 {
            fs::write(
                dir.path().join(format!("S{:04}.txt", i)),
                format!("# MarkDuplicates INPUT=S{:04}.bam\n", i),
            )?;
        }

        let sources = find_log_files(dir.path(), &ModuleConfig::default(), &ExtensionCleaner::default())?;
        assert_eq!(sources.len(), 1500);

        let line_counts: Vec<usize> = sources
            .into_iter()
            .map(|source| source.into_lines().2.count())
            .collect();
        assert!(line_counts.iter().all(|&n| n == 1));
        Ok(())
    }

    #[test]
    fn test_file_removed_after_discovery_yields_no_lines() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("S1.txt");
        fs::write(&path, "# MarkDuplicates INPUT=S1.bam\n")?;

        let source = LogSource::open(&path, &ExtensionCleaner::default());
        fs::remove_file(&path)?;

        let (s_name, info, lines) = source.into_lines();
        assert_eq!(s_name, "S1");
        assert_eq!(info.path.as_deref(), Some(path.as_path()));
        assert_eq!(lines.count(), 0);
        Ok(())
    }
}
