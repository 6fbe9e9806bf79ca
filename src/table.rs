//! Duplication metrics table parsing
//!
//! The table is a tab-delimited header naming the metrics followed by one
//! row per library. Rows always have exactly ten fields; anything else ends
//! the table.

use crate::MetricValue;
use std::iter::Peekable;

/// Key whose presence marks the table header line
pub const TABLE_HEADER_KEY: &str = "UNPAIRED_READ_DUPLICATES";

/// Field count of a library row
pub const EXPECTED_COLUMNS: usize = 10;

pub fn is_table_header(line: &str) -> bool {
    line.contains(TABLE_HEADER_KEY)
}

/// Metrics decoded from one library row, in header order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryRecord {
    pub fields: Vec<(String, MetricValue)>,
}

impl LibraryRecord {
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub libraries: Vec<LibraryRecord>,
    pub rows_consumed: usize,
}

pub struct TableParser {
    keys: Vec<String>,
}

impl TableParser {
    pub fn from_header(header: &str) -> Self {
        let keys = split_fields(header).map(str::to_string).collect();
        Self { keys }
    }

    /// Decode one row, or `None` when it does not have the library row shape
    pub fn parse_row(&self, line: &str) -> Option<LibraryRecord> {
        let values: Vec<&str> = split_fields(line).collect();
        if values.len() != EXPECTED_COLUMNS {
            return None;
        }
        let fields = self
            .keys
            .iter()
            .zip(values)
            .map(|(key, raw)| (key.clone(), MetricValue::parse(raw)))
            .collect();
        Some(LibraryRecord { fields })
    }

    /// Consume library rows following the header. The first line that is not
    /// a library row is left in `lines`.
    pub fn parse_rows<I>(&self, lines: &mut Peekable<I>) -> ParsedTable
    where
        I: Iterator,
        I::Item: AsRef<str>,
    {
        let mut table = ParsedTable::default();
        while let Some(line) = lines.peek() {
            let Some(library) = self.parse_row(line.as_ref()) else {
                break;
            };
            lines.next();
            table.libraries.push(library);
            table.rows_consumed += 1;
        }
        table
    }
}

fn split_fields(line: &str) -> std::str::Split<'_, char> {
    line.trim_end_matches(|c| c == '\n' || c == '\r').split('\t')
}
