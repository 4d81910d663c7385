//! Decoding of spreadsheet documents into plain text grids.
//!
//! Every cell is normalized to its display text when the document is
//! decoded, so validation and compilation only ever see strings.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use chrono::NaiveTime;
use thiserror::Error;

/// First cell of a rule sheet.
pub const RULE_SET_MARKER: &str = "RuleSet";

/// Row index of the first data row in a rule sheet.
pub const DATA_START: usize = 9;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("unreadable workbook: {0}")]
    Decode(#[from] calamine::Error),
}

/// One sheet as rows of display text. Row `i` of `rows` is sheet row `i`;
/// rows past the last non-empty one are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: &str, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_owned(),
            rows,
        }
    }

    /// Display text of a cell; empty for a missing row or cell.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Whether the row has no content at all. Such rows are treated as absent;
    /// a row holding only whitespace is present and gets validated.
    #[must_use]
    pub fn is_blank_row(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map_or(true, |r| r.iter().all(String::is_empty))
    }

    /// A rule sheet has `RuleSet` (any case) in its first cell.
    #[must_use]
    pub fn is_rule_sheet(&self) -> bool {
        self.cell(0, 0).trim().eq_ignore_ascii_case(RULE_SET_MARKER)
    }

    /// Indices of non-blank rows at or after [`DATA_START`].
    pub fn data_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (DATA_START..self.rows.len()).filter(|&r| !self.is_blank_row(r))
    }
}

/// A decoded document: its sheets in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    #[must_use]
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// Rule sheets in document order. Every other sheet is invisible to
    /// validation and compilation.
    pub fn rule_sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter().filter(|s| {
            let rule = s.is_rule_sheet();
            if !rule {
                tracing::info!(sheet = %s.name, "skipping non-rule sheet");
            }
            rule
        })
    }

    /// Decode xlsx/xlsm/xlsb/xls/ods bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkbookError`] if the bytes are not a readable spreadsheet.
    pub fn decode(bytes: &[u8]) -> Result<Self, WorkbookError> {
        let mut doc = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let mut sheets = Vec::new();
        for name in doc.sheet_names() {
            let range = doc.worksheet_range(&name)?;
            sheets.push(Sheet::new(&name, grid(&range)));
        }
        Ok(Self { sheets })
    }
}

/// Lay a range out on absolute sheet coordinates.
fn grid(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let (start_row, start_col) = (start_row as usize, start_col as usize);
    let mut rows = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col];
        cells.extend(row.iter().map(display_text));
        rows.push(cells);
    }
    rows
}

/// Text a spreadsheet application would show for the cell under the default
/// format: whole floats lose their fraction, booleans are upper-case, dates
/// render as ISO 8601 and durations as `h:mm:ss`.
fn display_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) => excel_datetime_text(dt).unwrap_or_else(|| dt.as_f64().to_string()),
        Data::Int(i) => i.to_string(),
        #[allow(clippy::cast_possible_truncation)]
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_owned(),
        other => other.to_string(),
    }
}

fn excel_datetime_text(dt: &ExcelDateTime) -> Option<String> {
    if dt.is_duration() {
        let secs = dt.as_duration()?.num_seconds();
        return Some(format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60));
    }
    let value = dt.as_datetime()?;
    let text = if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    };
    Some(text)
}

/// Spreadsheet-style column name for a 0-based index: `A`..`Z`, `AA`, ...
#[must_use]
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
