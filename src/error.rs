use thiserror::Error;

use crate::store::StoreError;
use crate::workbook::WorkbookError;
use crate::{CompileError, ValidationError};

/// Unified error type covering every stage of a reload cycle.
///
/// Returned by convenience methods like [`RuleBase::from_bytes()`](crate::RuleBase::from_bytes)
/// and carried by [`ReloadOutcome::Failed`](crate::ReloadOutcome::Failed).
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("no candidate rule documents under prefix '{prefix}'")]
    NoCandidates { prefix: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
