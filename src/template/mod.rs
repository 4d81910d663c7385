//! Column templates of a rule table header.
//!
//! A CONDITION column names the request field it tests and, optionally, the
//! operator: `country`, `request.state != "$param"`, `city matches "$param"`.
//! An ACTION column names the response field it writes:
//! `discountPercentage`, `response.discountPercentage = "$param"` or
//! `response.setDiscountPercentage("$param")`.

mod error;
mod grammar;

pub use error::TemplateError;

use crate::{MatchOp, RequestField, ResponseField};

/// A parsed CONDITION template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTemplate {
    pub field: RequestField,
    pub op: MatchOp,
}

/// A parsed ACTION template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTemplate {
    pub field: ResponseField,
}

#[derive(Debug)]
pub(crate) struct RawCondition {
    pub(crate) binding: Option<String>,
    pub(crate) field: String,
    pub(crate) op: MatchOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActionForm {
    Bare,
    Assign,
    Setter,
}

#[derive(Debug)]
pub(crate) struct RawAction {
    pub(crate) target: Option<String>,
    pub(crate) name: String,
    pub(crate) form: ActionForm,
}

/// Parse a CONDITION template and resolve its request field.
///
/// # Errors
///
/// Returns [`TemplateError`] on a syntax error or an unknown field.
pub fn parse_condition(input: &str) -> Result<ConditionTemplate, TemplateError> {
    use winnow::Parser;
    let raw = grammar::condition
        .parse(input)
        .map_err(|e| TemplateError::new(e.to_string()))?;
    let field = RequestField::from_name(&raw.field).ok_or_else(|| {
        TemplateError::new(format!("unknown request field '{}'", raw.field))
    })?;
    if let Some(binding) = raw.binding {
        tracing::trace!(%binding, %field, "condition bound to request");
    }
    Ok(ConditionTemplate { field, op: raw.op })
}

/// Parse an ACTION template and resolve its response field.
///
/// # Errors
///
/// Returns [`TemplateError`] on a syntax error, a setter not named
/// `set<Field>`, or an unknown field.
pub fn parse_action(input: &str) -> Result<ActionTemplate, TemplateError> {
    use winnow::Parser;
    let raw = grammar::action
        .parse(input)
        .map_err(|e| TemplateError::new(e.to_string()))?;
    let name = match raw.form {
        ActionForm::Setter => raw.name.strip_prefix("set").ok_or_else(|| {
            TemplateError::new(format!("setter '{}' must be named set<Field>", raw.name))
        })?,
        ActionForm::Bare | ActionForm::Assign => raw.name.as_str(),
    };
    let field = ResponseField::from_name(name)
        .ok_or_else(|| TemplateError::new(format!("unknown response field '{name}'")))?;
    if let Some(target) = raw.target {
        tracing::trace!(%target, %field, "action bound to response");
    }
    Ok(ActionTemplate { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_resolves_field_case_insensitively() {
        let c = parse_condition("request.LoyaltyTier == \"$param\"").unwrap();
        assert_eq!(c.field, RequestField::LoyaltyTier);
        assert_eq!(c.op, MatchOp::Eq);
    }

    #[test]
    fn condition_unknown_field() {
        let err = parse_condition("postcode").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid template: unknown request field 'postcode'"
        );
    }

    #[test]
    fn setter_resolves_field() {
        let a = parse_action("response.setConversionRateUSD(\"$param\")").unwrap();
        assert_eq!(a.field, ResponseField::ConversionRateUsd);
    }

    #[test]
    fn setter_without_set_prefix_fails() {
        let err = parse_action("response.conversionRateUSD(\"$param\")").unwrap_err();
        assert!(err.to_string().contains("must be named set<Field>"));
    }

    #[test]
    fn assignment_and_bare_actions() {
        assert_eq!(
            parse_action("response.discountPercentage = \"$param\"")
                .unwrap()
                .field,
            ResponseField::DiscountPercentage
        );
        assert_eq!(
            parse_action("conversionRateUSD").unwrap().field,
            ResponseField::ConversionRateUsd
        );
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(parse_condition("country = ").is_err());
        assert!(parse_action("").is_err());
    }
}
