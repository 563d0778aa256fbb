//! CheckUseCase: evaluate every selected subject and build a report.
//!
//! 1. Select subjects from the config
//! 2. Collect statistics per subject from the source
//! 3. Evaluate each variant against its assertions (and the baseline)
//! 4. Re-measure failing subjects while retries remain
//! 5. Fold verdicts into a report and an exit code

use crate::Clock;
use crate::runner::{AssertionRunner, fold_status};
use anyhow::Context;
use benchgate_adapters::StatisticsSource;
use benchgate_config::Config;
use benchgate_domain::StatisticsContext;
use benchgate_types::{
    AssertionStatus, BenchgateReport, REPORT_SCHEMA_V1, ReportStatus, ReportSummary,
    StatsDocument, SubjectConfig, SubjectReport, ToolInfo, VariantReport,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub config: Config,

    /// Subject names to check. Empty together with `groups` means all.
    pub subjects: Vec<String>,

    pub groups: Vec<String>,

    /// Statistics of a previous run, matched by (subject, variant).
    pub baseline: Option<StatsDocument>,

    pub tool: ToolInfo,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: BenchgateReport,

    /// 0 = pass, 2 = assertion failure, 1 = assertion error.
    pub exit_code: i32,
}

pub struct CheckUseCase<S: StatisticsSource, C: Clock> {
    source: S,
    clock: C,
    runner: AssertionRunner,
}

impl<S: StatisticsSource, C: Clock> CheckUseCase<S, C> {
    pub fn new(source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            runner: AssertionRunner::new(),
        }
    }

    pub fn execute(&self, req: CheckRequest) -> anyhow::Result<CheckOutcome> {
        let selected = req.config.select(&req.subjects, &req.groups)?;
        if selected.is_empty() {
            warn!("no subjects selected");
        }

        let mut subjects = Vec::with_capacity(selected.len());
        for subject in selected {
            let report = if subject.skip {
                info!(subject = %subject.name, "skipping subject");
                SubjectReport {
                    subject: subject.name.clone(),
                    skipped: true,
                    variants: Vec::new(),
                }
            } else {
                self.check_subject(subject, req.config.max_retries, req.baseline.as_ref())?
            };
            subjects.push(report);
        }

        let summary = summarize(&subjects);
        let status = subjects
            .iter()
            .flat_map(|s| s.variants.iter().map(|v| v.status))
            .fold(ReportStatus::Pass, ReportStatus::worst);

        let report = BenchgateReport {
            schema: REPORT_SCHEMA_V1.to_string(),
            tool: req.tool,
            generated_at: self.clock.now_rfc3339(),
            status,
            subjects,
            summary,
        };

        Ok(CheckOutcome {
            exit_code: status.exit_code(),
            report,
        })
    }

    fn check_subject(
        &self,
        subject: &SubjectConfig,
        max_retries: u32,
        baseline: Option<&StatsDocument>,
    ) -> anyhow::Result<SubjectReport> {
        if subject.assertions.is_empty() {
            debug!(subject = %subject.name, "no assertions; nothing to measure");
            return Ok(SubjectReport {
                subject: subject.name.clone(),
                skipped: false,
                variants: Vec::new(),
            });
        }

        let mut attempt = 1;
        loop {
            let variants = self.check_attempt(subject, attempt, baseline)?;
            let status = variants
                .iter()
                .map(|v| v.status)
                .fold(ReportStatus::Pass, ReportStatus::worst);

            let retry = status == ReportStatus::Fail
                && subject.retry_threshold.is_some()
                && self.source.can_remeasure()
                && attempt <= max_retries;

            if !retry {
                info!(subject = %subject.name, attempts = attempt, ?status, "checked subject");
                return Ok(SubjectReport {
                    subject: subject.name.clone(),
                    skipped: false,
                    variants,
                });
            }

            warn!(
                subject = %subject.name,
                attempt,
                max_retries,
                "assertion failed; re-measuring"
            );
            attempt += 1;
        }
    }

    fn check_attempt(
        &self,
        subject: &SubjectConfig,
        attempt: u32,
        baseline: Option<&StatsDocument>,
    ) -> anyhow::Result<Vec<VariantReport>> {
        let measured = self
            .source
            .collect(&subject.name, attempt)
            .with_context(|| {
                format!(
                    "failed to collect statistics for subject '{}' (attempt {attempt})",
                    subject.name
                )
            })?;

        Ok(measured
            .iter()
            .map(|variant| {
                let baseline_stats = baseline
                    .and_then(|doc| doc.find(&variant.subject, &variant.variant))
                    .map(|b| &b.stats);
                let ctx = StatisticsContext::new(&variant.stats).with_baseline(baseline_stats);
                let assertions = self.runner.evaluate_all(&subject.assertions, &ctx);

                let status = fold_status(&assertions);
                if status == ReportStatus::Error {
                    warn!(
                        subject = %subject.name,
                        variant = %variant.variant,
                        "assertion error"
                    );
                }

                VariantReport {
                    variant: variant.variant.clone(),
                    status,
                    attempts: attempt,
                    assertions,
                }
            })
            .collect())
    }
}

fn summarize(subjects: &[SubjectReport]) -> ReportSummary {
    let mut summary = ReportSummary::default();
    for subject in subjects {
        if subject.skipped {
            summary.skipped_subjects += 1;
        }
        for result in subject.variants.iter().flat_map(|v| &v.assertions) {
            match result.status {
                AssertionStatus::Passed => summary.passed += 1,
                AssertionStatus::Failed => summary.failed += 1,
                AssertionStatus::Error => summary.errored += 1,
            }
        }
    }
    summary
}
