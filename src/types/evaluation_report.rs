use std::fmt;
use std::time::Duration;

use super::request::DiscountResponse;

/// Detailed evaluation report returned by
/// [`Evaluator::evaluate_detailed()`](crate::Evaluator::evaluate_detailed).
///
/// Contains the populated response, the rules that fired in firing order,
/// the version of the rule base evaluated against, and the wall-clock
/// duration of the evaluation.
#[derive(Debug, Clone)]
#[must_use]
pub struct EvaluationReport {
    response: DiscountResponse,
    fired: Vec<String>,
    version_tag: String,
    duration: Duration,
}

impl EvaluationReport {
    pub(crate) fn new(
        response: DiscountResponse,
        fired: Vec<String>,
        version_tag: String,
        duration: Duration,
    ) -> Self {
        Self {
            response,
            fired,
            version_tag,
            duration,
        }
    }

    /// The response, same as [`Evaluator::evaluate()`](crate::Evaluator::evaluate).
    #[must_use]
    pub fn response(&self) -> &DiscountResponse {
        &self.response
    }

    #[must_use]
    pub fn into_response(self) -> DiscountResponse {
        self.response
    }

    /// Names of rules that fired, in ordinal order.
    #[must_use]
    pub fn fired(&self) -> &[String] {
        &self.fired
    }

    #[must_use]
    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fired: [{}]", self.fired.join(", "))?;
        write!(
            f,
            ", conversionRateUSD: {}, discountPercentage: {}",
            self.response.conversion_rate_usd.as_deref().unwrap_or("-"),
            self.response.discount_percentage.as_deref().unwrap_or("-"),
        )?;
        write!(f, ", version: {}", self.version_tag)?;
        write!(f, ", duration: {:?}", self.duration)
    }
}
