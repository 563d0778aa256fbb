//! Performance assertion expressions.
//!
//! This crate is intentionally I/O-free: it turns strings such as
//! `mode.time < 10 milliseconds +/- 5%` into an [`Assertion`] and knows how to
//! normalize time and memory literals. Evaluation lives in `benchgate-domain`.

pub mod ast;
pub mod parser;
pub mod units;

pub use ast::{
    Assertion, Comparator, Comparison, MemoryValue, PercentageValue, PropertyAccess, TimeValue,
    Value, WithinRangeOf,
};
pub use benchgate_error::ParseError;
pub use parser::parse;
pub use units::{MemoryUnit, TimeUnit, format_canonical};
