use std::fmt;

use crate::workbook::column_letter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A message from the rule-base builder, located in the source document.
///
/// `row` and `column` are 0-based; `Display` renders them as a 1-based row
/// number and a spreadsheet column letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub sheet: String,
    pub row: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn error(sheet: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            sheet: sheet.to_owned(),
            row: None,
            column: None,
            message: message.into(),
        }
    }

    pub(crate) fn warning(sheet: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(sheet, message)
        }
    }

    #[must_use]
    pub(crate) fn at(mut self, row: usize, column: Option<usize>) -> Self {
        self.row = Some(row);
        self.column = column;
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: sheet '{}'", self.severity, self.sheet)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row + 1)?;
        }
        if let Some(col) = self.column {
            write!(f, " col {}", column_letter(col))?;
        }
        write!(f, ": {}", self.message)
    }
}
