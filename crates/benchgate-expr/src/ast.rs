//! Assertion syntax tree.
//!
//! The root type only has constraint variants, so a parse can never produce a
//! bare value.

use crate::units::{MemoryUnit, TimeUnit};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    Comparison(Comparison),
    WithinRangeOf(WithinRangeOf),
}

/// `left <op> right [+/- tolerance]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub left: Value,
    pub operator: Comparator,
    pub right: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<Value>,
}

/// `subject within range of anchor [+/- tolerance]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithinRangeOf {
    pub subject: Value,
    pub range: Value,
    pub anchor: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<Value>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Comparator {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::LessThan => "<",
            Comparator::LessThanOrEqual => "<=",
            Comparator::Equal => "=",
            Comparator::GreaterThanOrEqual => ">=",
            Comparator::GreaterThan => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    PropertyAccess(PropertyAccess),
    Time(TimeValue),
    Memory(MemoryValue),
    Percentage(PercentageValue),
}

/// A dotted path into a statistics record, e.g. `mode.time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyAccess {
    pub segments: Vec<String>,
}

impl PropertyAccess {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> String {
        self.segments.join(".")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TimeValue {
    pub magnitude: f64,
    pub unit: TimeUnit,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct MemoryValue {
    pub magnitude: f64,
    pub unit: MemoryUnit,
}

/// Relative to a companion value; meaningless on its own.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PercentageValue {
    pub magnitude: f64,
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Comparison(c) => fmt::Display::fmt(c, f),
            Assertion::WithinRangeOf(w) => fmt::Display::fmt(w, f),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)?;
        if let Some(tolerance) = &self.tolerance {
            write!(f, " +/- {tolerance}")?;
        }
        Ok(())
    }
}

impl fmt::Display for WithinRangeOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} within {} of {}", self.subject, self.range, self.anchor)?;
        if let Some(tolerance) = &self.tolerance {
            write!(f, " +/- {tolerance}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::PropertyAccess(p) => f.write_str(&p.path()),
            Value::Time(t) => write!(f, "{} {}", t.magnitude, t.unit.name()),
            Value::Memory(m) => write!(f, "{} {}", m.magnitude, m.unit.name()),
            Value::Percentage(p) => write!(f, "{}%", p.magnitude),
        }
    }
}
