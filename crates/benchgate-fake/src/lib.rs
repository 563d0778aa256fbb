//! Fake statistics sources for tests.

use benchgate_adapters::{AdapterError, StatisticsSource};
use benchgate_types::{DEFAULT_VARIANT, Statistics, VariantStatistics};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Serves scripted measurements, one script entry per attempt.
///
/// Attempts past the end of a subject's script repeat its last entry.
#[derive(Debug, Default)]
pub struct FakeStatisticsSource {
    scripts: BTreeMap<String, Vec<Vec<VariantStatistics>>>,
    failures: BTreeMap<String, String>,
    remeasure: bool,
    calls: Mutex<Vec<(String, u32)>>,
}

impl FakeStatisticsSource {
    pub fn new() -> Self {
        Self {
            remeasure: true,
            ..Self::default()
        }
    }

    /// A source that behaves like a static snapshot.
    pub fn snapshot() -> Self {
        Self::default()
    }

    /// Append one attempt with a single default variant.
    pub fn with_attempt(self, subject: &str, pairs: &[(&str, f64)]) -> Self {
        self.with_variants(subject, &[(DEFAULT_VARIANT, pairs)])
    }

    /// Append one attempt with several variants.
    pub fn with_variants(mut self, subject: &str, variants: &[(&str, &[(&str, f64)])]) -> Self {
        let attempt = variants
            .iter()
            .map(|(variant, pairs)| VariantStatistics {
                subject: subject.to_string(),
                variant: variant.to_string(),
                stats: dotted(pairs),
            })
            .collect();
        self.scripts
            .entry(subject.to_string())
            .or_default()
            .push(attempt);
        self
    }

    /// Make every collection of `subject` fail.
    pub fn with_failure(mut self, subject: &str, message: &str) -> Self {
        self.failures
            .insert(subject.to_string(), message.to_string());
        self
    }

    /// `(subject, attempt)` for every `collect` call so far.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn attempts_for(&self, subject: &str) -> usize {
        self.calls().iter().filter(|(s, _)| s == subject).count()
    }
}

impl StatisticsSource for FakeStatisticsSource {
    fn collect(
        &self,
        subject: &str,
        attempt: u32,
    ) -> Result<Vec<VariantStatistics>, AdapterError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((subject.to_string(), attempt));
        }

        if let Some(message) = self.failures.get(subject) {
            return Err(AdapterError::Other(anyhow::anyhow!("{message}")));
        }

        let script = self
            .scripts
            .get(subject)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AdapterError::NoStatistics(subject.to_string()))?;
        let index = (attempt.max(1) as usize - 1).min(script.len() - 1);
        Ok(script[index].clone())
    }

    fn can_remeasure(&self) -> bool {
        self.remeasure
    }
}

/// Scripts are test input; an invalid key empties the record.
fn dotted(pairs: &[(&str, f64)]) -> Statistics {
    Statistics::from_dotted(pairs.iter().copied()).unwrap_or_default()
}
