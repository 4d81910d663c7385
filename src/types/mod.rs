mod diagnostic;
mod error;
mod evaluation_report;
mod request;
mod rule;
mod rule_base;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{CellViolation, CompileError, EvalError, ValidationError, ValidationReport};
pub use evaluation_report::EvaluationReport;
pub use request::{DiscountRequest, DiscountResponse, RequestField, ResponseField};
pub use rule::{CompiledRule, Effect, MatchOp, Predicate};
pub use rule_base::{RuleBase, RuleBaseBuilder, RuleBuilder};
