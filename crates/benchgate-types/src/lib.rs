//! Shared types for benchgate.
//!
//! Design goal: versioned, explicit, boring.
//! Statistics documents come in from the measurement layer, config comes in
//! from the developer, reports go out to CI.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const STATS_SCHEMA_V1: &str = "benchgate.stats.v1";
pub const REPORT_SCHEMA_V1: &str = "benchgate.report.v1";

pub const DEFAULT_VARIANT: &str = "default";
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

// ----------------------------
// Units and statistics
// ----------------------------

/// The family a magnitude belongs to once normalized.
///
/// Time is canonically seconds, memory is bytes, ratio is a percentage on the
/// 0-100 scale.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    Time,
    Memory,
    Ratio,
}

impl UnitFamily {
    pub fn name(self) -> &'static str {
        match self {
            UnitFamily::Time => "time",
            UnitFamily::Memory => "memory",
            UnitFamily::Ratio => "percentage",
        }
    }
}

/// A measured dimension of a benchmark variant.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Time,
    Mem,
    MemPeak,
    MemReal,
    MemFinal,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Time,
        Dimension::Mem,
        Dimension::MemPeak,
        Dimension::MemReal,
        Dimension::MemFinal,
    ];

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "time" => Some(Dimension::Time),
            "mem" => Some(Dimension::Mem),
            "mem_peak" => Some(Dimension::MemPeak),
            "mem_real" => Some(Dimension::MemReal),
            "mem_final" => Some(Dimension::MemFinal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Time => "time",
            Dimension::Mem => "mem",
            Dimension::MemPeak => "mem_peak",
            Dimension::MemReal => "mem_real",
            Dimension::MemFinal => "mem_final",
        }
    }

    /// Time dimensions are seconds-denominated, memory dimensions bytes.
    pub fn family(self) -> UnitFamily {
        match self {
            Dimension::Time => UnitFamily::Time,
            Dimension::Mem | Dimension::MemPeak | Dimension::MemReal | Dimension::MemFinal => {
                UnitFamily::Memory
            }
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statistical aggregate over the iterations of a variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aggregate {
    Mode,
    Mean,
    Variance,
    Stdev,
    Min,
    Max,
    Sum,
    /// `pN`, with `N` in `0..=100`.
    Percentile(u8),
}

impl Aggregate {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "mode" => Some(Aggregate::Mode),
            "mean" => Some(Aggregate::Mean),
            "variance" => Some(Aggregate::Variance),
            "stdev" => Some(Aggregate::Stdev),
            "min" => Some(Aggregate::Min),
            "max" => Some(Aggregate::Max),
            "sum" => Some(Aggregate::Sum),
            other => {
                let digits = other.strip_prefix('p')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let n: u8 = digits.parse().ok()?;
                (n <= 100).then_some(Aggregate::Percentile(n))
            }
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Mode => f.write_str("mode"),
            Aggregate::Mean => f.write_str("mean"),
            Aggregate::Variance => f.write_str("variance"),
            Aggregate::Stdev => f.write_str("stdev"),
            Aggregate::Min => f.write_str("min"),
            Aggregate::Max => f.write_str("max"),
            Aggregate::Sum => f.write_str("sum"),
            Aggregate::Percentile(n) => write!(f, "p{n}"),
        }
    }
}

/// Aggregates for one dimension. Absent fields were not computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Aggregates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdev: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,

    /// Percentile (0-100) to value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub percentiles: BTreeMap<u8, f64>,
}

impl Aggregates {
    pub fn get(&self, aggregate: Aggregate) -> Option<f64> {
        match aggregate {
            Aggregate::Mode => self.mode,
            Aggregate::Mean => self.mean,
            Aggregate::Variance => self.variance,
            Aggregate::Stdev => self.stdev,
            Aggregate::Min => self.min,
            Aggregate::Max => self.max,
            Aggregate::Sum => self.sum,
            Aggregate::Percentile(n) => self.percentiles.get(&n).copied(),
        }
    }

    pub fn set(&mut self, aggregate: Aggregate, value: f64) {
        let slot = match aggregate {
            Aggregate::Mode => &mut self.mode,
            Aggregate::Mean => &mut self.mean,
            Aggregate::Variance => &mut self.variance,
            Aggregate::Stdev => &mut self.stdev,
            Aggregate::Min => &mut self.min,
            Aggregate::Max => &mut self.max,
            Aggregate::Sum => &mut self.sum,
            Aggregate::Percentile(n) => {
                self.percentiles.insert(n, value);
                return;
            }
        };
        *slot = Some(value);
    }

    fn entries(&self) -> impl Iterator<Item = (Aggregate, f64)> + '_ {
        let fixed = [
            (Aggregate::Mode, self.mode),
            (Aggregate::Mean, self.mean),
            (Aggregate::Variance, self.variance),
            (Aggregate::Stdev, self.stdev),
            (Aggregate::Min, self.min),
            (Aggregate::Max, self.max),
            (Aggregate::Sum, self.sum),
        ];
        fixed
            .into_iter()
            .filter_map(|(a, v)| v.map(|v| (a, v)))
            .chain(
                self.percentiles
                    .iter()
                    .map(|(n, v)| (Aggregate::Percentile(*n), *v)),
            )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatisticsError {
    #[error("invalid statistic key `{0}` (expected <aggregate>.<dimension>, e.g. mode.time)")]
    InvalidKey(String),

    #[error("statistic `{key}` must be a finite number, got {value}")]
    NonFinite { key: String, value: f64 },
}

/// The statistics record for one variant: dimension to aggregates.
///
/// Time values are seconds, memory values bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct Statistics {
    pub dimensions: BTreeMap<Dimension, Aggregates>,
}

impl Statistics {
    pub fn get(&self, aggregate: Aggregate, dimension: Dimension) -> Option<f64> {
        self.dimensions.get(&dimension)?.get(aggregate)
    }

    pub fn set(&mut self, aggregate: Aggregate, dimension: Dimension, value: f64) {
        self.dimensions
            .entry(dimension)
            .or_default()
            .set(aggregate, value);
    }

    /// Build a record from flat `"<aggregate>.<dimension>"` keys.
    pub fn from_dotted<'a, I>(pairs: I) -> Result<Self, StatisticsError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut stats = Statistics::default();
        for (key, value) in pairs {
            let (aggregate, dimension) = key
                .split_once('.')
                .and_then(|(a, d)| Some((Aggregate::from_segment(a)?, Dimension::from_segment(d)?)))
                .ok_or_else(|| StatisticsError::InvalidKey(key.to_string()))?;
            if !value.is_finite() {
                return Err(StatisticsError::NonFinite {
                    key: key.to_string(),
                    value,
                });
            }
            stats.set(aggregate, dimension, value);
        }
        Ok(stats)
    }

    /// Flatten into `"<aggregate>.<dimension>"` keys.
    pub fn to_dotted(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (dimension, aggregates) in &self.dimensions {
            for (aggregate, value) in aggregates.entries() {
                out.insert(format!("{aggregate}.{dimension}"), value);
            }
        }
        out
    }
}

/// Statistics of one (subject, variant) pair as produced by the measurement layer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct VariantStatistics {
    pub subject: String,

    #[serde(default = "default_variant")]
    pub variant: String,

    pub stats: Statistics,
}

fn default_variant() -> String {
    DEFAULT_VARIANT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StatsDocument {
    pub schema: String,

    #[serde(default)]
    pub results: Vec<VariantStatistics>,
}

impl StatsDocument {
    pub fn new(results: Vec<VariantStatistics>) -> Self {
        Self {
            schema: STATS_SCHEMA_V1.to_string(),
            results,
        }
    }

    pub fn for_subject<'a>(
        &'a self,
        subject: &'a str,
    ) -> impl Iterator<Item = &'a VariantStatistics> + 'a {
        self.results.iter().filter(move |r| r.subject == subject)
    }

    pub fn find(&self, subject: &str, variant: &str) -> Option<&VariantStatistics> {
        self.results
            .iter()
            .find(|r| r.subject == subject && r.variant == variant)
    }
}

// ----------------------------
// Config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default, rename = "subject")]
    pub subjects: Vec<SubjectConfigFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DefaultsConfig {
    /// Assertions applied to every subject, before the subject's own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<String>,

    /// Percentage deviation at which the measurement layer re-runs a subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_threshold: Option<f64>,

    /// Extra measurement attempts allowed after a failed assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct SubjectConfigFile {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_threshold: Option<f64>,
}

/// A subject with defaults applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectConfig {
    pub name: String,
    pub groups: Vec<String>,
    pub skip: bool,
    pub assertions: Vec<String>,
    pub retry_threshold: Option<f64>,
}

impl SubjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_groups(&self, groups: &[String]) -> bool {
        self.groups.iter().any(|g| groups.contains(g))
    }
}

// ----------------------------
// Report
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssertionStatus {
    Passed,
    Failed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AssertionResult {
    pub expression: String,
    pub status: AssertionStatus,
    pub message: String,

    /// Canonical magnitudes (seconds, bytes or percent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitFamily>,

    /// `parse` or `resolve`, set only when `status` is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pass,
    Fail,
    Error,
}

impl ReportStatus {
    /// Errors dominate failures, failures dominate passes.
    pub fn worst(self, other: ReportStatus) -> ReportStatus {
        self.max(other)
    }

    /// 0 = pass, 2 = assertion failure, 1 = configuration/tooling error.
    pub fn exit_code(self) -> i32 {
        match self {
            ReportStatus::Pass => 0,
            ReportStatus::Fail => 2,
            ReportStatus::Error => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct VariantReport {
    pub variant: String,
    pub status: ReportStatus,

    /// Number of measurements the final verdicts were taken from.
    pub attempts: u32,

    pub assertions: Vec<AssertionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SubjectReport {
    pub subject: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,

    #[serde(default)]
    pub variants: Vec<VariantReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReportSummary {
    pub passed: u32,
    pub failed: u32,
    pub errored: u32,
    pub skipped_subjects: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BenchgateReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub generated_at: String,
    pub status: ReportStatus,
    pub subjects: Vec<SubjectReport>,
    pub summary: ReportSummary,
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn aggregate_strategy() -> impl Strategy<Value = Aggregate> {
        prop_oneof![
            Just(Aggregate::Mode),
            Just(Aggregate::Mean),
            Just(Aggregate::Variance),
            Just(Aggregate::Stdev),
            Just(Aggregate::Min),
            Just(Aggregate::Max),
            Just(Aggregate::Sum),
            (0u8..=100).prop_map(Aggregate::Percentile),
        ]
    }

    fn dimension_strategy() -> impl Strategy<Value = Dimension> {
        proptest::sample::select(Dimension::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // Flattening then rebuilding a record yields the same record.
        #[test]
        fn dotted_round_trip(
            entries in proptest::collection::vec(
                (aggregate_strategy(), dimension_strategy(), -1.0e9f64..1.0e9),
                0..20,
            )
        ) {
            let mut stats = Statistics::default();
            for (a, d, v) in &entries {
                stats.set(*a, *d, *v);
            }
            let flat = stats.to_dotted();
            let rebuilt = Statistics::from_dotted(flat.iter().map(|(k, v)| (k.as_str(), *v)))
                .expect("flattened keys are valid");
            prop_assert_eq!(rebuilt, stats);
        }

        #[test]
        fn aggregate_display_parses_back(a in aggregate_strategy()) {
            prop_assert_eq!(Aggregate::from_segment(&a.to_string()), Some(a));
        }
    }
}
