//! Decision tables for loyalty discounts, compiled from spreadsheets and
//! hot-reloaded from object storage.
//!
//! A [`ReloadManager`] promotes the newest uploaded workbook to a stable
//! alias key, validates and compiles it into an immutable [`RuleBase`], and
//! publishes that into a [`Registry`]. An [`Evaluator`] runs requests against
//! whatever is published when each request starts.

mod compile;
pub mod config;
mod error;
mod evaluate;
mod promote;
mod registry;
mod reload;
mod service;
pub mod store;
pub mod template;
mod types;
mod validate;
pub mod workbook;

pub use compile::{compile, detect_namespace};
pub use config::ReloadConfig;
pub use error::ReloadError;
pub use evaluate::Evaluator;
pub use promote::{promote, Promotion};
pub use registry::Registry;
pub use reload::{ReloadManager, ReloadOutcome};
pub use service::{ApiError, DiscountService, ErrorResponse};
pub use types::{
    CellViolation, CompileError, CompiledRule, Diagnostic, DiscountRequest, DiscountResponse,
    Effect, EvalError, EvaluationReport, MatchOp, Predicate, RequestField, ResponseField,
    RuleBase, RuleBaseBuilder, RuleBuilder, Severity, ValidationError, ValidationReport,
};
pub use validate::{validate, ColumnRule, COLUMN_RULES};
