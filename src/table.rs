//! Markdown table parsing.
//!
//! [`parse_markdown_table`] pulls the first pipe table out of a block of
//! Markdown and returns it as a [`Table`] ready for spreadsheet export. The
//! parser is deliberately permissive and pure: no I/O, no validation of the
//! separator row, no padding of short rows.
//!
//! ```text
//! | Name | Age |     ← header
//! |---|---|          ← second pipe line, always discarded
//! | Alice | 30 |     ← data rows
//! ```

use serde::Serialize;
use std::collections::HashSet;

const DELIMITER: char = '|';

/// Ordered column names plus ordered rows of cell strings.
///
/// Rows are kept exactly as parsed: a row may hold fewer or more cells than
/// there are headers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// True when there is nothing worth exporting: no columns or no rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Whether every row has exactly one cell per header.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.headers.len())
    }
}

/// Parse the pipe table in `text`, or `None` when no table is found.
///
/// Only lines whose first non-blank character is `|` take part. The first
/// such line is the header, the second is dropped unconditionally, the rest
/// are data rows. Each line is split on `|` and the first and last segments
/// are dropped; cells are trimmed. Rows that yield no cells are skipped.
/// Columns that are empty in every row are then removed.
///
/// Returns `None` when fewer than two pipe lines exist, when the header has
/// no cells, or when no data rows remain.
pub fn parse_markdown_table(text: &str) -> Option<Table> {
    let table_lines: Vec<&str> = text
        .lines()
        .filter(|line| line.trim_start().starts_with(DELIMITER))
        .collect();

    if table_lines.len() < 2 {
        return None;
    }

    let headers = split_cells(table_lines[0]);
    if headers.is_empty() {
        return None;
    }

    let rows: Vec<Vec<String>> = table_lines[2..]
        .iter()
        .map(|line| split_cells(line))
        .filter(|cells| !cells.is_empty())
        .collect();

    if rows.is_empty() {
        return None;
    }

    let table = drop_empty_columns(Table {
        headers: unique_headers(headers),
        rows,
    });
    if table.rows.is_empty() {
        return None;
    }
    Some(table)
}

/// Split a pipe line into trimmed cells, dropping the outer segments.
fn split_cells(line: &str) -> Vec<String> {
    let segments: Vec<&str> = line.split(DELIMITER).collect();
    if segments.len() < 3 {
        return Vec::new();
    }
    segments[1..segments.len() - 1]
        .iter()
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Make repeated header names unique: `A`, `A.1`, `A.2`, …
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let mut n = 1;
            loop {
                let candidate = format!("{name}.{n}");
                if !taken.contains(&candidate) {
                    taken.insert(candidate.clone());
                    seen.insert(candidate.clone());
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Remove every header-indexed column whose cell is `""` in every row.
///
/// A row too short to reach a column counts as non-empty there, so ragged
/// input never loses a column on account of missing cells.
fn drop_empty_columns(table: Table) -> Table {
    let keep: Vec<bool> = (0..table.headers.len())
        .map(|col| {
            !table
                .rows
                .iter()
                .all(|row| row.get(col).is_some_and(|cell| cell.is_empty()))
        })
        .collect();

    if keep.iter().all(|k| *k) {
        return table;
    }

    let retain = |cells: Vec<String>| -> Vec<String> {
        cells
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep.get(*i).copied().unwrap_or(true))
            .map(|(_, cell)| cell)
            .collect()
    };

    Table {
        headers: retain(table.headers),
        rows: table.rows.into_iter().map(retain).collect(),
    }
}
