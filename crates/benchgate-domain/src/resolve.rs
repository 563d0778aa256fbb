//! Property paths to statistics.
//!
//! A closed lookup over (source, aggregate, dimension); paths are never walked
//! structurally.

use benchgate_error::ResolveError;
use benchgate_expr::PropertyAccess;
use benchgate_types::{Aggregate, Dimension, Statistics, UnitFamily};

const BASELINE: &str = "baseline";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Source {
    Current,
    Baseline,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StatKey {
    pub source: Source,
    pub aggregate: Aggregate,
    pub dimension: Dimension,
}

impl StatKey {
    /// Recognized shapes:
    ///
    /// - `<aggregate>.<dimension>`
    /// - `baseline.<aggregate>.<dimension>`
    /// - `baseline.<dimension>` (the baseline mode)
    pub fn from_path(path: &PropertyAccess) -> Result<StatKey, ResolveError> {
        let segments: Vec<&str> = path.segments.iter().map(String::as_str).collect();
        let key = match segments.as_slice() {
            [BASELINE, dimension] => Some((Source::Baseline, Some(Aggregate::Mode), *dimension)),
            [BASELINE, aggregate, dimension] => Some((
                Source::Baseline,
                Aggregate::from_segment(aggregate),
                *dimension,
            )),
            [aggregate, dimension] => Some((
                Source::Current,
                Aggregate::from_segment(aggregate),
                *dimension,
            )),
            _ => None,
        };

        match key {
            Some((source, Some(aggregate), dimension)) => match Dimension::from_segment(dimension)
            {
                Some(dimension) => Ok(StatKey {
                    source,
                    aggregate,
                    dimension,
                }),
                None => Err(unknown(path)),
            },
            _ => Err(unknown(path)),
        }
    }
}

fn unknown(path: &PropertyAccess) -> ResolveError {
    ResolveError::UnknownProperty { path: path.path() }
}

/// A canonical magnitude tagged with its unit family.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quantity {
    pub magnitude: f64,
    pub family: UnitFamily,
}

/// The statistics an assertion is evaluated against.
#[derive(Debug, Copy, Clone)]
pub struct StatisticsContext<'a> {
    current: &'a Statistics,
    baseline: Option<&'a Statistics>,
}

impl<'a> StatisticsContext<'a> {
    pub fn new(current: &'a Statistics) -> Self {
        Self {
            current,
            baseline: None,
        }
    }

    pub fn with_baseline(mut self, baseline: Option<&'a Statistics>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn resolve(&self, path: &PropertyAccess) -> Result<Quantity, ResolveError> {
        let key = StatKey::from_path(path)?;
        let record = match key.source {
            Source::Current => self.current,
            Source::Baseline => self
                .baseline
                .ok_or_else(|| ResolveError::NoBaseline { path: path.path() })?,
        };
        let magnitude =
            record
                .get(key.aggregate, key.dimension)
                .ok_or_else(|| ResolveError::NotMeasured {
                    path: path.path(),
                    field: format!("{}.{}", key.aggregate, key.dimension),
                })?;
        Ok(Quantity {
            magnitude,
            family: key.dimension.family(),
        })
    }
}
