//! Domain logic for benchgate.
//!
//! This crate is intentionally I/O-free: it resolves property paths against
//! statistics and decides whether an assertion holds.

pub mod evaluate;
pub mod resolve;

pub use evaluate::{Evaluation, Verdict, evaluate};
pub use resolve::{Quantity, Source, StatKey, StatisticsContext};

use benchgate_error::AssertionError;

/// Parse and evaluate in one step. A malformed expression is an `Error` verdict.
pub fn evaluate_expression(expression: &str, ctx: &StatisticsContext<'_>) -> Verdict {
    match benchgate_expr::parse(expression) {
        Ok(assertion) => evaluate(&assertion, ctx),
        Err(err) => Verdict::Error(AssertionError::Parse(err)),
    }
}
