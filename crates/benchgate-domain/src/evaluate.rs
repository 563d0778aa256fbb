//! Assertion evaluation.

use crate::resolve::{Quantity, StatisticsContext};
use benchgate_error::{AssertionError, ResolveError};
use benchgate_expr::{Assertion, Comparator, Comparison, Value, WithinRangeOf, format_canonical};
use benchgate_types::UnitFamily;
use std::fmt;

/// Numeric context of an evaluated assertion, in canonical units.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub message: String,
    pub actual: f64,
    pub expected: f64,
    /// Absolute slack that was applied (range plus tolerance for range checks).
    pub tolerance: f64,
    pub family: UnitFamily,
}

/// Outcome of one assertion against one statistics snapshot.
///
/// `Failed` is a performance regression; `Error` is a defect in the assertion
/// or the statistics it was pointed at. They are never interchangeable.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Passed(Evaluation),
    Failed(Evaluation),
    Error(AssertionError),
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Verdict::Failed(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Verdict::Passed(e) | Verdict::Failed(e) => Some(e),
            Verdict::Error(_) => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed(e) | Verdict::Failed(e) => f.write_str(&e.message),
            Verdict::Error(err) => fmt::Display::fmt(err, f),
        }
    }
}

/// Evaluate a parsed assertion.
pub fn evaluate(assertion: &Assertion, ctx: &StatisticsContext<'_>) -> Verdict {
    let result = match assertion {
        Assertion::Comparison(c) => evaluate_comparison(c, ctx),
        Assertion::WithinRangeOf(w) => evaluate_within(w, ctx),
    };
    result.unwrap_or_else(|err| Verdict::Error(err.into()))
}

fn evaluate_comparison(
    c: &Comparison,
    ctx: &StatisticsContext<'_>,
) -> Result<Verdict, ResolveError> {
    let left = resolve_value(&c.left, ctx)?;
    let right = resolve_value(&c.right, ctx)?;
    same_family("comparison", left, right)?;

    let tolerance = match &c.tolerance {
        Some(t) => relative_to(t, right, "tolerance", ctx)?,
        None => 0.0,
    };

    let (l, r) = (left.magnitude, right.magnitude);
    let passed = match c.operator {
        Comparator::LessThan => l < r + tolerance,
        Comparator::LessThanOrEqual => l <= r + tolerance,
        Comparator::GreaterThanOrEqual => l >= r - tolerance,
        Comparator::GreaterThan => l > r - tolerance,
        // No implicit epsilon: without a tolerance this is exact equality.
        Comparator::Equal => (l - r).abs() <= tolerance,
    };

    let family = right.family;
    let mut message = format!(
        "{} {} {} {}",
        format_canonical(l, family),
        if passed { "is" } else { "is not" },
        c.operator,
        format_canonical(r, family),
    );
    if tolerance != 0.0 {
        message.push_str(&format!(" +/- {}", format_canonical(tolerance, family)));
    }

    Ok(verdict(
        passed,
        Evaluation {
            message,
            actual: l,
            expected: r,
            tolerance,
            family,
        },
    ))
}

fn evaluate_within(w: &WithinRangeOf, ctx: &StatisticsContext<'_>) -> Result<Verdict, ResolveError> {
    let subject = resolve_value(&w.subject, ctx)?;
    let anchor = resolve_value(&w.anchor, ctx)?;
    same_family("range check", subject, anchor)?;

    let range = relative_to(&w.range, anchor, "range", ctx)?;
    let tolerance = match &w.tolerance {
        Some(t) => relative_to(t, anchor, "tolerance", ctx)?,
        None => 0.0,
    };
    let limit = range + tolerance;

    let (s, a) = (subject.magnitude, anchor.magnitude);
    // Same test `=` applies with tolerance `limit`.
    let passed = (s - a).abs() <= limit;

    let family = anchor.family;
    let mut message = format!(
        "{} {} within {} of {} (deviation {})",
        format_canonical(s, family),
        if passed { "is" } else { "is not" },
        format_canonical(limit, family),
        format_canonical(a, family),
        format_canonical((s - a).abs(), family),
    );
    if a == 0.0 && matches!(w.range, Value::Percentage(_)) {
        message.push_str("; a percentage of a zero anchor is zero");
    }

    Ok(verdict(
        passed,
        Evaluation {
            message,
            actual: s,
            expected: a,
            tolerance: limit,
            family,
        },
    ))
}

fn verdict(passed: bool, evaluation: Evaluation) -> Verdict {
    if passed {
        Verdict::Passed(evaluation)
    } else {
        Verdict::Failed(evaluation)
    }
}

/// Literal or property to a canonical quantity. A bare percentage is a
/// dimensionless ratio on the 0-100 scale.
fn resolve_value(value: &Value, ctx: &StatisticsContext<'_>) -> Result<Quantity, ResolveError> {
    Ok(match value {
        Value::PropertyAccess(p) => ctx.resolve(p)?,
        Value::Time(t) => Quantity {
            magnitude: t.seconds(),
            family: UnitFamily::Time,
        },
        Value::Memory(m) => Quantity {
            magnitude: m.bytes(),
            family: UnitFamily::Memory,
        },
        Value::Percentage(p) => Quantity {
            magnitude: p.magnitude,
            family: UnitFamily::Ratio,
        },
    })
}

/// Absolute slack for a tolerance or range, expressed against `peer`.
///
/// Percentages scale `|peer|`; anything else must share the peer's family.
fn relative_to(
    value: &Value,
    peer: Quantity,
    context: &'static str,
    ctx: &StatisticsContext<'_>,
) -> Result<f64, ResolveError> {
    let magnitude = match value {
        Value::Percentage(p) => peer.magnitude.abs() * p.magnitude / 100.0,
        other => {
            let q = resolve_value(other, ctx)?;
            same_family(context, peer, q)?;
            q.magnitude
        }
    };
    Ok(magnitude.abs())
}

fn same_family(context: &'static str, left: Quantity, right: Quantity) -> Result<(), ResolveError> {
    if left.family == right.family {
        Ok(())
    } else {
        Err(ResolveError::UnitMismatch {
            context,
            left: left.family.name(),
            right: right.family.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchgate_expr::parse;
    use benchgate_types::Statistics;

    fn stats(pairs: &[(&str, f64)]) -> Statistics {
        Statistics::from_dotted(pairs.iter().copied()).unwrap()
    }

    fn eval(expr: &str, current: &Statistics, baseline: Option<&Statistics>) -> Verdict {
        let ast = parse(expr).unwrap();
        evaluate(&ast, &StatisticsContext::new(current).with_baseline(baseline))
    }

    fn eval_literal(expr: &str) -> Verdict {
        eval(expr, &Statistics::default(), None)
    }

    #[test]
    fn literal_time_comparison_passes() {
        assert!(eval_literal("10 milliseconds < 20 milliseconds").is_passed());
    }

    #[test]
    fn literal_memory_comparison_fails_with_canonical_bytes() {
        let verdict = eval_literal("50 megabytes <= 10 megabytes");
        let Verdict::Failed(e) = verdict else {
            panic!("expected failure, got {verdict:?}");
        };
        assert_eq!(e.actual, 50.0 * 1_048_576.0);
        assert_eq!(e.expected, 10.0 * 1_048_576.0);
        assert_eq!(e.tolerance, 0.0);
        assert_eq!(e.family, UnitFamily::Memory);
        insta::assert_snapshot!(e.message, @"50.000MiB is not <= 10.000MiB");
    }

    #[test]
    fn percentage_tolerance_widens_upper_bound() {
        let current = stats(&[("mode.time", 5.4)]);
        let verdict = eval("mode.time < 5 seconds +/- 10%", &current, None);
        let Verdict::Passed(e) = verdict else {
            panic!("expected pass, got {verdict:?}");
        };
        assert!((e.tolerance - 0.5).abs() < 1e-12);
        assert_eq!(e.actual, 5.4);
        assert_eq!(e.expected, 5.0);

        let current = stats(&[("mode.time", 5.6)]);
        let verdict = eval("mode.time < 5 seconds +/- 10%", &current, None);
        let Verdict::Failed(e) = verdict else {
            panic!("expected failure, got {verdict:?}");
        };
        insta::assert_snapshot!(e.message, @"5.600s is not < 5.000s +/- 500.000ms");
    }

    #[test]
    fn within_percentage_of_baseline() {
        let baseline = stats(&[("mode.mem", 1000.0)]);

        let current = stats(&[("mode.mem", 1020.0)]);
        let verdict = eval("mode.mem within 2% of baseline.mem", &current, Some(&baseline));
        let Verdict::Passed(e) = verdict else {
            panic!("expected pass, got {verdict:?}");
        };
        assert_eq!(e.tolerance, 20.0);

        let current = stats(&[("mode.mem", 1021.0)]);
        let verdict = eval("mode.mem within 2% of baseline.mem", &current, Some(&baseline));
        let Verdict::Failed(e) = verdict else {
            panic!("expected failure, got {verdict:?}");
        };
        insta::assert_snapshot!(e.message, @"1021B is not within 20B of 1000B (deviation 21B)");

        let current = stats(&[("mode.mem", 979.0)]);
        assert!(eval("mode.mem within 2% of baseline.mem", &current, Some(&baseline)).is_failed());
    }

    #[test]
    fn within_absolute_range_with_tolerance() {
        let current = stats(&[("mode.time", 0.0121)]);
        let v = eval(
            "mode.time within 1 millisecond of 11 milliseconds +/- 200 microseconds",
            &current,
            None,
        );
        assert!(v.is_passed(), "{v:?}");
        let v = eval(
            "mode.time within 1 millisecond of 11 milliseconds",
            &current,
            None,
        );
        assert!(v.is_failed(), "{v:?}");
    }

    #[test]
    fn unknown_property_is_an_error_not_a_failure() {
        let verdict = eval_literal("unknown.path < 1 second");
        assert_eq!(
            verdict,
            Verdict::Error(AssertionError::Resolve(ResolveError::UnknownProperty {
                path: "unknown.path".into()
            }))
        );
    }

    #[test]
    fn missing_baseline_is_an_error() {
        let current = stats(&[("mode.time", 1.0)]);
        let verdict = eval("mode.time <= baseline.time +/- 5%", &current, None);
        assert!(verdict.is_error());
        insta::assert_snapshot!(
            verdict.to_string(),
            @"unresolvable property `baseline.time`: no baseline statistics available"
        );
    }

    #[test]
    fn unit_family_mismatch_is_an_error() {
        let current = stats(&[("mode.time", 1.0)]);
        let verdict = eval("mode.time < 5 megabytes", &current, None);
        assert_eq!(
            verdict,
            Verdict::Error(AssertionError::Resolve(ResolveError::UnitMismatch {
                context: "comparison",
                left: "time",
                right: "memory",
            }))
        );

        let verdict = eval("mode.time < 5 seconds +/- 1 byte", &current, None);
        assert!(verdict.is_error());

        let verdict = eval("mode.time within 5 bytes of 1 second", &current, None);
        assert!(verdict.is_error());

        let verdict = eval("mode.time within 5% of 1 byte", &current, None);
        assert!(verdict.is_error());
    }

    #[test]
    fn bare_percentages_compare_as_ratios() {
        assert!(eval_literal("5% < 10%").is_passed());
        assert!(eval_literal("50% <= 10% +/- 400%").is_passed());
        assert!(eval_literal("5% < 10 seconds").is_error());
    }

    // Exact equality without tolerance is the documented contract, even though
    // statistics rarely match bit for bit.
    #[test]
    fn equality_without_tolerance_is_exact() {
        let current = stats(&[("mode.time", 0.1 + 0.2)]);
        let verdict = eval("mode.time = 300 milliseconds", &current, None);
        assert!(verdict.is_failed(), "{verdict:?}");

        let current = stats(&[("mode.time", 0.3)]);
        let verdict = eval("mode.time = 300 milliseconds", &current, None);
        assert!(verdict.is_passed(), "{verdict:?}");

        let current = stats(&[("mode.time", 0.1 + 0.2)]);
        let verdict = eval("mode.time = 300 milliseconds +/- 1 microsecond", &current, None);
        assert!(verdict.is_passed(), "{verdict:?}");
    }

    #[test]
    fn lower_bound_operators_widen_downwards() {
        let current = stats(&[("mean.mem", 950.0)]);
        assert!(eval("mean.mem >= 1000 bytes +/- 5%", &current, None).is_passed());
        assert!(eval("mean.mem > 1000 bytes +/- 5%", &current, None).is_failed());
        assert!(eval("mean.mem > 1000 bytes +/- 6%", &current, None).is_passed());
    }

    #[test]
    fn zero_anchor_collapses_percentage_range() {
        let current = stats(&[("mode.mem", 1.0)]);
        let baseline = stats(&[("mode.mem", 0.0)]);
        let verdict = eval("mode.mem within 50% of baseline.mem", &current, Some(&baseline));
        let Verdict::Failed(e) = verdict else {
            panic!("expected failure, got {verdict:?}");
        };
        assert_eq!(e.tolerance, 0.0);
        assert!(e.message.ends_with("a percentage of a zero anchor is zero"));

        let current = stats(&[("mode.mem", 0.0)]);
        assert!(
            eval("mode.mem within 50% of baseline.mem", &current, Some(&baseline)).is_passed()
        );
    }

    #[test]
    fn within_matches_equality_at_float_boundary() {
        // |0.30000000000000004 - 0.1| is 0.20000000000000004, just past the range.
        assert!(eval_literal("0.30000000000000004 seconds within 0.2 seconds of 0.1 seconds").is_failed());
        assert!(eval_literal("0.30000000000000004 seconds = 0.1 seconds +/- 0.2 seconds").is_failed());
        assert!(eval_literal("0.3 seconds within 0.2 seconds of 0.1 seconds").is_passed());
    }

    #[test]
    fn negative_tolerance_still_widens() {
        let current = stats(&[("mode.time", 5.4)]);
        assert!(eval("mode.time < 5 seconds +/- -10%", &current, None).is_passed());
    }

    mod property_tests {
        use super::*;
        use benchgate_expr::{PercentageValue, PropertyAccess, TimeValue, TimeUnit};
        use proptest::prelude::*;

        fn time_stats(left: f64) -> Statistics {
            stats(&[("mode.time", left)])
        }

        fn seconds(magnitude: f64) -> Value {
            Value::Time(TimeValue {
                magnitude,
                unit: TimeUnit::Seconds,
            })
        }

        fn mode_time() -> Value {
            Value::PropertyAccess(PropertyAccess::new(["mode", "time"]))
        }

        fn percent(magnitude: f64) -> Value {
            Value::Percentage(PercentageValue { magnitude })
        }

        fn compare(op: Comparator, right: f64, tolerance: Option<Value>) -> Assertion {
            Assertion::Comparison(Comparison {
                left: mode_time(),
                operator: op,
                right: seconds(right),
                tolerance,
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn equality_with_absolute_tolerance(
                left in -1.0e3f64..1.0e3,
                right in -1.0e3f64..1.0e3,
                tol in 0.0f64..1.0e3,
            ) {
                let current = time_stats(left);
                let ctx = StatisticsContext::new(&current);
                let v = evaluate(&compare(Comparator::Equal, right, Some(seconds(tol))), &ctx);
                prop_assert_eq!(v.is_passed(), (left - right).abs() <= tol);
                prop_assert!(!v.is_error());
            }

            #[test]
            fn equality_without_tolerance(left in -1.0e3f64..1.0e3, right in -1.0e3f64..1.0e3) {
                let current = time_stats(left);
                let ctx = StatisticsContext::new(&current);
                let v = evaluate(&compare(Comparator::Equal, right, None), &ctx);
                prop_assert_eq!(v.is_passed(), left == right);
                let v = evaluate(&compare(Comparator::Equal, left, None), &ctx);
                prop_assert!(v.is_passed());
            }

            #[test]
            fn equality_with_percentage_tolerance(
                left in -1.0e3f64..1.0e3,
                right in -1.0e3f64..1.0e3,
                pct in 0.0f64..200.0,
            ) {
                let current = time_stats(left);
                let ctx = StatisticsContext::new(&current);
                let v = evaluate(&compare(Comparator::Equal, right, Some(percent(pct))), &ctx);
                let tol = right.abs() * pct / 100.0;
                prop_assert_eq!(v.is_passed(), (left - right).abs() <= tol);
            }

            // A percentage range check is an equality with the same
            // percentage tolerance.
            #[test]
            fn within_agrees_with_equality(
                subject in -1.0e6f64..1.0e6,
                anchor in -1.0e6f64..1.0e6,
                pct in 0.0f64..100.0,
            ) {
                let current = time_stats(subject);
                let ctx = StatisticsContext::new(&current);

                let within = Assertion::WithinRangeOf(WithinRangeOf {
                    subject: mode_time(),
                    range: percent(pct),
                    anchor: seconds(anchor),
                    tolerance: None,
                });
                let equal = compare(Comparator::Equal, anchor, Some(percent(pct)));

                prop_assert_eq!(
                    evaluate(&within, &ctx).is_passed(),
                    evaluate(&equal, &ctx).is_passed()
                );
            }

            // Widening never turns a pass into a failure.
            #[test]
            fn tolerance_is_monotonic(
                left in -1.0e3f64..1.0e3,
                right in -1.0e3f64..1.0e3,
                small in 0.0f64..10.0,
                extra in 0.0f64..10.0,
                op in proptest::sample::select(vec![
                    Comparator::LessThan,
                    Comparator::LessThanOrEqual,
                    Comparator::Equal,
                    Comparator::GreaterThanOrEqual,
                    Comparator::GreaterThan,
                ]),
            ) {
                let current = time_stats(left);
                let ctx = StatisticsContext::new(&current);
                let narrow = evaluate(&compare(op, right, Some(percent(small))), &ctx);
                let wide = evaluate(&compare(op, right, Some(percent(small + extra))), &ctx);
                if narrow.is_passed() {
                    prop_assert!(wide.is_passed());
                }
            }
        }
    }
}
