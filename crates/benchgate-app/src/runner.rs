//! Assertion runner: parse once, evaluate many times.

use benchgate_domain::{StatisticsContext, Verdict, evaluate};
use benchgate_error::{AssertionError, ParseError};
use benchgate_expr::Assertion;
use benchgate_types::{AssertionResult, AssertionStatus, ReportStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type Parsed = Result<Arc<Assertion>, ParseError>;

/// Evaluates assertion strings against statistics.
///
/// The only state is a parse cache keyed by expression string; it is shared
/// behind a `RwLock`, so one runner can serve many threads.
#[derive(Debug, Default)]
pub struct AssertionRunner {
    cache: RwLock<HashMap<String, Parsed>>,
}

impl AssertionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `expression`, or return the cached outcome of an earlier parse.
    pub fn parse(&self, expression: &str) -> Parsed {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(parsed) = cache.get(expression) {
                return parsed.clone();
            }
        }

        let parsed = benchgate_expr::parse(expression).map(Arc::new);
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(expression.to_string())
            .or_insert(parsed)
            .clone()
    }

    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn evaluate(&self, expression: &str, ctx: &StatisticsContext<'_>) -> Verdict {
        let verdict = match self.parse(expression) {
            Ok(assertion) => evaluate(&assertion, ctx),
            Err(err) => Verdict::Error(AssertionError::Parse(err)),
        };
        debug!(expression, verdict = %verdict, "evaluated assertion");
        verdict
    }

    /// Evaluate every expression in order. Each one stands alone: a broken
    /// expression never masks the verdicts of its neighbours.
    pub fn evaluate_all(
        &self,
        expressions: &[String],
        ctx: &StatisticsContext<'_>,
    ) -> Vec<AssertionResult> {
        expressions
            .iter()
            .map(|expression| assertion_result(expression, &self.evaluate(expression, ctx)))
            .collect()
    }
}

pub fn assertion_result(expression: &str, verdict: &Verdict) -> AssertionResult {
    let status = match verdict {
        Verdict::Passed(_) => AssertionStatus::Passed,
        Verdict::Failed(_) => AssertionStatus::Failed,
        Verdict::Error(_) => AssertionStatus::Error,
    };
    let evaluation = verdict.evaluation();
    AssertionResult {
        expression: expression.to_string(),
        status,
        message: verdict.to_string(),
        actual: evaluation.map(|e| e.actual),
        expected: evaluation.map(|e| e.expected),
        tolerance: evaluation.map(|e| e.tolerance),
        unit: evaluation.map(|e| e.family),
        error_kind: match verdict {
            Verdict::Error(err) => Some(err.kind().to_string()),
            _ => None,
        },
    }
}

/// Errors dominate failures, failures dominate passes.
pub fn fold_status(results: &[AssertionResult]) -> ReportStatus {
    results
        .iter()
        .map(|r| match r.status {
            AssertionStatus::Passed => ReportStatus::Pass,
            AssertionStatus::Failed => ReportStatus::Fail,
            AssertionStatus::Error => ReportStatus::Error,
        })
        .fold(ReportStatus::Pass, ReportStatus::worst)
}
