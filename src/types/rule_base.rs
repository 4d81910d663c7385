use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::diagnostic::Diagnostic;
use super::error::CompileError;
use super::request::{RequestField, ResponseField};
use super::rule::{CompiledRule, Effect, Predicate};

/// Builder for constructing a [`RuleBase`].
///
/// Rules are appended in firing order. Diagnostics reported while building
/// are checked by [`build()`](Self::build): any error-severity diagnostic
/// fails the build and no `RuleBase` is produced.
///
/// # Example
///
/// ```
/// use loyalty_rules::{Predicate, RequestField, ResponseField, RuleBaseBuilder};
///
/// let base = RuleBaseBuilder::new("loyalty")
///     .rule("au_bronze", |r| {
///         r.when(Predicate::Equals { field: RequestField::Country, value: "AU".into() })
///             .then(ResponseField::DiscountPercentage, "0.66")
///     })
///     .build()
///     .unwrap();
/// assert_eq!(base.len(), 1);
/// ```
#[derive(Debug)]
pub struct RuleBaseBuilder {
    namespace: String,
    version_tag: Option<String>,
    rules: Vec<CompiledRule>,
    diagnostics: Vec<Diagnostic>,
}

/// Intermediate builder passed to the rule definition closure.
#[derive(Debug, Default)]
pub struct RuleBuilder {
    predicates: Vec<Predicate>,
    effects: Vec<Effect>,
}

impl RuleBuilder {
    /// Add a predicate. All predicates of a rule must hold for it to fire.
    #[must_use]
    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Shorthand for an equality predicate.
    #[must_use]
    pub fn when_eq(self, field: RequestField, value: &str) -> Self {
        self.when(Predicate::Equals {
            field,
            value: value.to_owned(),
        })
    }

    /// Add an effect applied when the rule fires.
    #[must_use]
    pub fn then(mut self, field: ResponseField, value: &str) -> Self {
        self.effects.push(Effect {
            field,
            value: value.to_owned(),
        });
        self
    }
}

impl RuleBaseBuilder {
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            version_tag: None,
            rules: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tag the base with the version of the document it was built from.
    #[must_use]
    pub fn version_tag(mut self, tag: &str) -> Self {
        self.version_tag = Some(tag.to_owned());
        self
    }

    /// Define a rule. Its ordinal is the number of rules defined before it.
    #[must_use]
    pub fn rule(mut self, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        let built = f(RuleBuilder::default());
        self.push_rule(name, built.predicates, built.effects);
        self
    }

    pub(crate) fn push_rule(
        &mut self,
        name: &str,
        predicates: Vec<Predicate>,
        effects: Vec<Effect>,
    ) {
        let ordinal = self.rules.len();
        self.rules.push(CompiledRule {
            name: name.to_owned(),
            namespace: self.namespace.clone(),
            ordinal,
            predicates,
            effects,
        });
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics reported so far, in report order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Freeze the rules into an immutable `RuleBase`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] carrying every error-severity diagnostic if
    /// there is at least one.
    pub fn build(self) -> Result<RuleBase, CompileError> {
        let errors: Vec<Diagnostic> = self
            .diagnostics
            .into_iter()
            .filter(Diagnostic::is_error)
            .collect();
        if !errors.is_empty() {
            return Err(CompileError { diagnostics: errors });
        }

        let mut rules = HashMap::new();
        rules.insert(self.namespace.clone(), self.rules);

        Ok(RuleBase {
            namespace: self.namespace,
            rules,
            version_tag: self.version_tag.unwrap_or_default(),
            compiled_at: Utc::now(),
        })
    }
}

/// A compiled, immutable rule base. Thread-safe and designed to live behind `Arc`.
#[derive(Debug)]
pub struct RuleBase {
    namespace: String,
    rules: HashMap<String, Vec<CompiledRule>>,
    version_tag: String,
    compiled_at: DateTime<Utc>,
}

impl RuleBase {
    /// The namespace requests are evaluated in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Rules of the evaluation namespace in ordinal order.
    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        self.rules_in(&self.namespace)
    }

    /// Rules of any namespace; empty for an unknown one.
    #[must_use]
    pub fn rules_in(&self, namespace: &str) -> &[CompiledRule] {
        self.rules.get(namespace).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    #[must_use]
    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    /// Total number of rules across namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate a decoded workbook, detect its namespace and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError`](crate::ReloadError) on validation or compile
    /// failure.
    pub fn from_workbook(
        workbook: &crate::workbook::Workbook,
        version_tag: &str,
    ) -> Result<Self, crate::ReloadError> {
        crate::validate::validate(workbook)?;
        let namespace = crate::compile::detect_namespace(workbook)?;
        let base = crate::compile::compile(workbook, &namespace, version_tag)?;
        Ok(base)
    }

    /// Decode spreadsheet bytes and build a rule base from them.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError`](crate::ReloadError) on decode, validation, or
    /// compile failure.
    pub fn from_bytes(bytes: &[u8], version_tag: &str) -> Result<Self, crate::ReloadError> {
        let workbook = crate::workbook::Workbook::decode(bytes)?;
        Self::from_workbook(&workbook, version_tag)
    }

    /// Rule names in firing order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.rules().iter().map(CompiledRule::name).collect()
    }
}

impl fmt::Display for RuleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleBase({}, {} rules, {})",
            self.namespace,
            self.len(),
            if self.version_tag.is_empty() {
                "untagged"
            } else {
                self.version_tag.as_str()
            },
        )
    }
}
