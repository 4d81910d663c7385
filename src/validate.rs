use std::sync::LazyLock;

use regex::Regex;

use crate::types::{CellViolation, ValidationError, ValidationReport};
use crate::workbook::Workbook;

/// A pattern every data cell of one column must match.
#[derive(Debug)]
pub struct ColumnRule {
    pub column: usize,
    pub pattern: Regex,
    pub message: &'static str,
}

fn column_rule(column: usize, pattern: &str, message: &'static str) -> ColumnRule {
    ColumnRule {
        column,
        pattern: Regex::new(pattern)
            .unwrap_or_else(|e| panic!("bad column pattern {pattern}: {e}")),
        message,
    }
}

/// The lookup columns of every rule sheet, in column order.
pub static COLUMN_RULES: LazyLock<[ColumnRule; 5]> = LazyLock::new(|| {
    [
        column_rule(1, r"^[A-Z]{2}$", "Country code must be 2-letter"),
        column_rule(2, r"^[A-Z]{2,3}$", "State code must be 2 or 3-letter"),
        column_rule(3, r"^[A-Z]{3}$", "City code must be 3-letter"),
        column_rule(4, r"^[A-Z]{3}$", "Loyalty code must be 3-letter"),
        column_rule(5, r"^\d{1,2}$", "Loyalty period must be 1 to 2 digits"),
    ]
});

/// Check every data row of every rule sheet against [`COLUMN_RULES`].
///
/// Cells are trimmed before matching; a missing cell is matched as the empty
/// string. All violations are collected before failing.
///
/// # Errors
///
/// Returns [`ValidationError::Cells`] with the full report if any cell fails.
pub fn validate(workbook: &Workbook) -> Result<(), ValidationError> {
    let mut report = ValidationReport::default();

    for sheet in workbook.rule_sheets() {
        for row in sheet.data_rows() {
            for rule in COLUMN_RULES.iter() {
                let text = sheet.cell(row, rule.column).trim();
                if !rule.pattern.is_match(text) {
                    report.push(CellViolation {
                        sheet: sheet.name.clone(),
                        row_number: row + 1,
                        column: rule.column,
                        message: rule.message,
                        value: text.to_owned(),
                    });
                }
            }
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        tracing::error!(violations = report.len(), "rule document failed validation");
        Err(ValidationError::Cells(report))
    }
}
