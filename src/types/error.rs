use std::fmt;

use thiserror::Error;

use super::diagnostic::Diagnostic;
use crate::workbook::column_letter;

/// The rule-base builder reported at least one error-severity diagnostic.
#[derive(Debug, Error)]
#[error(
    "rule base build failed with {} error(s):\n{}",
    .diagnostics.len(),
    render_lines(.diagnostics)
)]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

/// A single cell that failed its column pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellViolation {
    pub sheet: String,
    /// 1-based, as shown in a spreadsheet application.
    pub row_number: usize,
    /// 0-based column index.
    pub column: usize,
    pub message: &'static str,
    pub value: String,
}

impl CellViolation {
    #[must_use]
    pub fn column_letter(&self) -> String {
        column_letter(self.column)
    }
}

impl fmt::Display for CellViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sheet {} - Row {} Col {}: {} [\"{}\"]",
            self.sheet,
            self.row_number,
            self.column_letter(),
            self.message,
            self.value
        )
    }
}

/// Every cell violation found in a document, in sheet, row, column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<CellViolation>,
}

impl ValidationReport {
    pub(crate) fn push(&mut self, violation: CellViolation) {
        self.violations.push(violation);
    }

    #[must_use]
    pub fn violations(&self) -> &[CellViolation] {
        &self.violations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.violations {
            writeln!(f, "{v}")?;
        }
        Ok(())
    }
}

/// The document is structurally unusable as a rule source.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("validation errors:\n{0}")]
    Cells(ValidationReport),

    #[error("no rule sheets with a RuleSet header found")]
    NoRuleSheets,

    #[error("RuleSet value blank in sheet '{sheet}'")]
    BlankNamespace { sheet: String },
}

/// Failure of a single evaluation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("no discount rule found for request")]
    NoMatch,

    #[error("no rule base has been published yet")]
    RulesUnavailable,
}

fn render_lines(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
