//! Small CSV reader for the pipeline's own artifacts.
//!
//! Handles quoted fields and doubled quotes. Quoted fields spanning lines are
//! not supported; the contacts and results files never contain them.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// A parsed CSV file: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Read and parse `path`; bytes that are not UTF-8 (Latin-1 exports) are replaced.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .map(|line| {
                split_record(line)
                    .into_iter()
                    .map(|name| name.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let rows = lines.map(split_record).collect();
        Self { header, rows }
    }

    /// Index of the first header matching any of `names`, ignoring case.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| {
            self.header
                .iter()
                .position(|header| header.eq_ignore_ascii_case(name))
        })
    }

    /// Trimmed cell value, empty when the row is short.
    pub fn cell<'a>(&self, row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(|value| value.trim()).unwrap_or("")
    }
}

/// Split one CSV line into fields.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}
