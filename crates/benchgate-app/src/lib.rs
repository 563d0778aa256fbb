//! Application layer for benchgate.
//!
//! The app layer coordinates adapters and domain logic.
//! It does not parse CLI flags and it does not do filesystem I/O.

pub mod check;
pub mod render;
pub mod runner;
pub mod validate;

pub use check::{CheckOutcome, CheckRequest, CheckUseCase};
pub use render::{render_result, render_text, status_marker};
pub use runner::{AssertionRunner, assertion_result, fold_status};
pub use validate::{InvalidAssertion, ValidateOutcome, ValidateUseCase};

use benchgate_domain::StatisticsContext;
use benchgate_types::{AssertionResult, Statistics};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

/// Evaluate one expression ad hoc, outside of any config.
pub fn eval_expression(
    expression: &str,
    current: &Statistics,
    baseline: Option<&Statistics>,
) -> AssertionResult {
    let ctx = StatisticsContext::new(current).with_baseline(baseline);
    let verdict = AssertionRunner::new().evaluate(expression, &ctx);
    assertion_result(expression, &verdict)
}
