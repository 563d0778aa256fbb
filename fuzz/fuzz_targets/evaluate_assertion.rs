#![no_main]

use arbitrary::Arbitrary;
use benchgate_domain::{StatisticsContext, Verdict, evaluate_expression};
use benchgate_types::Statistics;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    expression: String,
    current: Statistics,
    baseline: Option<Statistics>,
}

fuzz_target!(|input: Input| {
    let ctx = StatisticsContext::new(&input.current).with_baseline(input.baseline.as_ref());
    let verdict = evaluate_expression(&input.expression, &ctx);

    // Every verdict renders, and only errors lack values.
    let message = verdict.to_string();
    match &verdict {
        Verdict::Error(_) => assert!(verdict.evaluation().is_none()),
        _ => assert!(verdict.evaluation().is_some(), "{message}"),
    }
});
