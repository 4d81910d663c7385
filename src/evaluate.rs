use std::sync::Arc;
use std::time::Instant;

use crate::registry::Registry;
use crate::{DiscountRequest, DiscountResponse, EvalError, EvaluationReport, RuleBase};

/// Evaluates requests against whatever rule base is published at the moment
/// each evaluation starts.
///
/// Cheap to clone; every clone reads the same [`Registry`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<Registry>,
}

/// State of one evaluation: the snapshot it is pinned to and the response
/// being accumulated. Dropped at the end of every evaluation, whichever way
/// it ends.
struct Session {
    snapshot: Arc<RuleBase>,
    response: DiscountResponse,
    fired: Vec<String>,
}

impl Session {
    fn open(registry: &Registry) -> Result<Self, EvalError> {
        let snapshot = registry.current().ok_or(EvalError::RulesUnavailable)?;
        Ok(Self {
            snapshot,
            response: DiscountResponse::new(),
            fired: Vec::new(),
        })
    }

    fn run(&mut self, request: &DiscountRequest) -> usize {
        for rule in self.snapshot.rules() {
            if rule.matches(request) {
                rule.fire(&mut self.response);
                tracing::debug!(rule = rule.name(), ordinal = rule.ordinal(), "rule fired");
                self.fired.push(rule.name().to_owned());
            }
        }
        self.fired.len()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::trace!(
            version = self.snapshot.version_tag(),
            fired = self.fired.len(),
            "evaluation session released"
        );
    }
}

impl Evaluator {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Run every rule of the current rule base against `request` in ordinal
    /// order and return the response the matching rules wrote.
    ///
    /// # Errors
    ///
    /// [`EvalError::RulesUnavailable`] before any rule base is published and
    /// [`EvalError::NoMatch`] when no rule fires.
    pub fn evaluate(&self, request: &DiscountRequest) -> Result<DiscountResponse, EvalError> {
        self.evaluate_detailed(request)
            .map(EvaluationReport::into_response)
    }

    /// Like [`evaluate()`](Self::evaluate), also reporting which rules fired,
    /// the version evaluated against, and how long it took.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate()`](Self::evaluate).
    pub fn evaluate_detailed(
        &self,
        request: &DiscountRequest,
    ) -> Result<EvaluationReport, EvalError> {
        let start = Instant::now();
        let mut session = Session::open(&self.registry)?;
        let fired = session.run(request);
        tracing::debug!(fired, version = session.snapshot.version_tag(), "evaluation complete");
        if fired == 0 {
            return Err(EvalError::NoMatch);
        }

        Ok(EvaluationReport::new(
            std::mem::take(&mut session.response),
            std::mem::take(&mut session.fired),
            session.snapshot.version_tag().to_owned(),
            start.elapsed(),
        ))
    }
}
