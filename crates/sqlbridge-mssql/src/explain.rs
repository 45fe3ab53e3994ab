//! EXPLAIN support: bind interpolation and plan rendering.
//!
//! `SET SHOWPLAN_ALL ON` does not accept prepared statements, so binds are
//! inlined as literals before the plan is requested. The plan rows are
//! printed as an ASCII table.

use std::fmt::Write as _;

use sqlbridge_core::connection::RowSet;
use sqlbridge_core::dialect::Dialect;
use sqlbridge_core::quoting;
use sqlbridge_core::value::SqlValue;

/// Widest cell, in characters, before values are truncated.
pub const MAX_COLUMN_WIDTH: usize = 50;
const CELL_PADDING: usize = 1;

/// Statement turning plan output on.
pub const SHOWPLAN_ON: &str = "SET SHOWPLAN_ALL ON";
/// Statement turning plan output off.
pub const SHOWPLAN_OFF: &str = "SET SHOWPLAN_ALL OFF";

/// Replaces each `?` outside quotes with the next bind rendered as a literal.
///
/// Placeholders without a matching bind are kept.
#[must_use]
pub fn interpolate(sql: &str, binds: &[SqlValue], dialect: &dyn Dialect) -> String {
    let mut segments = quoting::split_placeholders(sql).into_iter();
    let mut out = String::with_capacity(sql.len());
    out.push_str(segments.next().unwrap_or_default());
    let mut values = binds.iter();
    for segment in segments {
        match values.next() {
            Some(value) => out.push_str(&dialect.quote(value)),
            None => out.push('?'),
        }
        out.push_str(segment);
    }
    out
}

/// ASCII table of plan rows.
#[derive(Debug)]
pub struct PrinterTable<'a> {
    rows: &'a RowSet,
}

impl<'a> PrinterTable<'a> {
    /// Wraps plan rows.
    #[must_use]
    pub const fn new(rows: &'a RowSet) -> Self {
        Self { rows }
    }

    /// Renders the header, the rows and a row count.
    #[must_use]
    pub fn pp(&self) -> String {
        let widths = self.column_widths();
        let separator = separator(&widths);
        let mut out = String::new();
        out.push_str(&separator);
        out.push('\n');
        out.push_str(&build_row(&widths, self.rows.columns.iter().map(String::as_str).map(truncate)));
        out.push('\n');
        out.push_str(&separator);
        out.push('\n');
        for row in &self.rows.rows {
            out.push_str(&build_row(&widths, row.iter().map(cast_item)));
            out.push('\n');
        }
        out.push_str(&separator);
        out.push('\n');
        let count = self.rows.rows.len();
        let _ = write!(out, "{count} {} in set", if count == 1 { "row" } else { "rows" });
        out
    }

    fn column_widths(&self) -> Vec<usize> {
        self.rows
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let widest_value = self
                    .rows
                    .rows
                    .iter()
                    .filter_map(|row| row.get(index))
                    .map(|value| cast_item(value).chars().count())
                    .max()
                    .unwrap_or(0);
                column.chars().count().max(widest_value).min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }
}

fn separator(widths: &[usize]) -> String {
    let cells: Vec<String> = widths
        .iter()
        .map(|width| "-".repeat(width + CELL_PADDING * 2))
        .collect();
    format!("+{}+", cells.join("+"))
}

fn build_row(widths: &[usize], cells: impl Iterator<Item = String>) -> String {
    let padding = " ".repeat(CELL_PADDING);
    let cells: Vec<String> = widths
        .iter()
        .zip(cells)
        .map(|(width, cell)| format!("{padding}{cell:<width$}{padding}"))
        .collect();
    format!("|{}|", cells.join("|"))
}

fn cast_item(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::from("NULL"),
        SqlValue::Float(f) => f.to_string().chars().take(10).collect(),
        other => truncate(&other.display_text()),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_COLUMN_WIDTH {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_COLUMN_WIDTH - 3).collect();
    short.push_str("...");
    short
}
