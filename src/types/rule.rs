use std::fmt;

use regex::Regex;

use super::request::{DiscountRequest, DiscountResponse, RequestField, ResponseField};

/// Operator a condition column applies between a request field and its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Eq,
    Neq,
    Matches,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOp::Eq => write!(f, "=="),
            MatchOp::Neq => write!(f, "!="),
            MatchOp::Matches => write!(f, "matches"),
        }
    }
}

/// One test against a request field.
///
/// `Matches` carries the cell pattern compiled once, anchored to the whole
/// field value.
#[derive(Debug, Clone)]
pub enum Predicate {
    Equals { field: RequestField, value: String },
    NotEquals { field: RequestField, value: String },
    Matches { field: RequestField, pattern: Regex },
}

impl Predicate {
    #[must_use]
    pub fn field(&self) -> RequestField {
        match self {
            Predicate::Equals { field, .. }
            | Predicate::NotEquals { field, .. }
            | Predicate::Matches { field, .. } => *field,
        }
    }

    #[must_use]
    pub fn test(&self, request: &DiscountRequest) -> bool {
        let actual = request.get(self.field());
        match self {
            Predicate::Equals { value, .. } => actual == value,
            Predicate::NotEquals { value, .. } => actual != value,
            Predicate::Matches { pattern, .. } => pattern.is_match(actual),
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Predicate::Equals { field: a, value: x },
                Predicate::Equals { field: b, value: y },
            )
            | (
                Predicate::NotEquals { field: a, value: x },
                Predicate::NotEquals { field: b, value: y },
            ) => a == b && x == y,
            (
                Predicate::Matches { field: a, pattern: x },
                Predicate::Matches { field: b, pattern: y },
            ) => a == b && x.as_str() == y.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { field, value } => write!(f, "{field} == \"{value}\""),
            Predicate::NotEquals { field, value } => write!(f, "{field} != \"{value}\""),
            Predicate::Matches { field, pattern } => {
                write!(f, "{field} matches \"{}\"", pattern.as_str())
            }
        }
    }
}

/// Assignment of a literal into the response when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub field: ResponseField,
    pub value: String,
}

impl Effect {
    pub fn apply(&self, response: &mut DiscountResponse) {
        response.set(self.field, &self.value);
    }
}

/// One data row of a rule sheet, compiled into predicates and effects.
///
/// `ordinal` is the row's position across all rule sheets of the document and
/// fixes firing order.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) ordinal: usize,
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) effects: Vec<Effect>,
}

impl CompiledRule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// True when every predicate holds. A rule without predicates matches all.
    #[must_use]
    pub fn matches(&self, request: &DiscountRequest) -> bool {
        self.predicates.iter().all(|p| p.test(request))
    }

    pub fn fire(&self, response: &mut DiscountResponse) {
        for effect in &self.effects {
            effect.apply(response);
        }
    }
}

impl fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{} when ", self.namespace, self.name)?;
        let conds: Vec<String> = self.predicates.iter().map(ToString::to_string).collect();
        write!(f, "[{}] then [", conds.join(" AND "))?;
        let effects: Vec<String> = self
            .effects
            .iter()
            .map(|e| format!("{} = \"{}\"", e.field, e.value))
            .collect();
        write!(f, "{}]", effects.join(", "))
    }
}
