//! Plain-text rendering for CI logs.

use benchgate_types::{AssertionResult, AssertionStatus, BenchgateReport, ReportStatus};

pub fn status_marker(status: AssertionStatus) -> &'static str {
    match status {
        AssertionStatus::Passed => "PASS",
        AssertionStatus::Failed => "FAIL",
        AssertionStatus::Error => "ERROR",
    }
}

pub fn render_result(result: &AssertionResult) -> String {
    format!(
        "{:<5} {}: {}",
        status_marker(result.status),
        result.expression,
        result.message
    )
}

pub fn render_text(report: &BenchgateReport) -> String {
    let mut out = String::new();

    let header = match report.status {
        ReportStatus::Pass => "benchgate: pass",
        ReportStatus::Fail => "benchgate: fail",
        ReportStatus::Error => "benchgate: error",
    };
    out.push_str(header);
    out.push('\n');

    for subject in &report.subjects {
        if subject.skipped {
            out.push_str(&format!("{}: skipped\n", subject.subject));
            continue;
        }
        if subject.variants.is_empty() {
            out.push_str(&format!("{}: no assertions\n", subject.subject));
            continue;
        }
        for variant in &subject.variants {
            out.push_str(&format!("{} [{}]", subject.subject, variant.variant));
            if variant.attempts > 1 {
                out.push_str(&format!(" (attempts: {})", variant.attempts));
            }
            out.push('\n');
            for result in &variant.assertions {
                out.push_str("  ");
                out.push_str(&render_result(result));
                out.push('\n');
            }
        }
    }

    let s = &report.summary;
    out.push_str(&format!(
        "\n{} passed, {} failed, {} errored, {} skipped\n",
        s.passed, s.failed, s.errored, s.skipped_subjects
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchgate_types::{
        REPORT_SCHEMA_V1, ReportSummary, SubjectReport, ToolInfo, UnitFamily, VariantReport,
    };

    fn result(expression: &str, status: AssertionStatus, message: &str) -> AssertionResult {
        AssertionResult {
            expression: expression.into(),
            status,
            message: message.into(),
            actual: None,
            expected: None,
            tolerance: None,
            unit: Some(UnitFamily::Time),
            error_kind: None,
        }
    }

    #[test]
    fn text_report_marks_failures_and_errors_differently() {
        let report = BenchgateReport {
            schema: REPORT_SCHEMA_V1.into(),
            tool: ToolInfo {
                name: "benchgate".into(),
                version: "0.4.0".into(),
            },
            generated_at: "2026-01-01T00:00:00Z".into(),
            status: ReportStatus::Error,
            subjects: vec![
                SubjectReport {
                    subject: "parse".into(),
                    skipped: false,
                    variants: vec![VariantReport {
                        variant: "default".into(),
                        status: ReportStatus::Error,
                        attempts: 2,
                        assertions: vec![
                            result(
                                "mode.time < 1 second",
                                AssertionStatus::Failed,
                                "2.000s is not < 1.000s",
                            ),
                            result(
                                "unknown.path < 1 second",
                                AssertionStatus::Error,
                                "unresolvable property `unknown.path`: unknown property",
                            ),
                        ],
                    }],
                },
                SubjectReport {
                    subject: "render".into(),
                    skipped: true,
                    variants: vec![],
                },
            ],
            summary: ReportSummary {
                passed: 0,
                failed: 1,
                errored: 1,
                skipped_subjects: 1,
            },
        };

        insta::assert_snapshot!(render_text(&report), @r"
        benchgate: error
        parse [default] (attempts: 2)
          FAIL  mode.time < 1 second: 2.000s is not < 1.000s
          ERROR unknown.path < 1 second: unresolvable property `unknown.path`: unknown property
        render: skipped

        0 passed, 1 failed, 1 errored, 1 skipped
        ");
    }

    #[test]
    fn result_line_pads_marker() {
        let line = render_result(&result("5% < 10%", AssertionStatus::Passed, "5.00% is < 10.00%"));
        assert_eq!(line, "PASS  5% < 10%: 5.00% is < 10.00%");
    }
}
