//! Test Harness - runs one submission against a list of test cases
//!
//! Glue between the engine (how code runs) and the evaluator (how output is
//! judged). Cases run one at a time in the order given, each in a fresh
//! execution context with its own input.

use crate::engine::Engine;
use crate::evaluator;
use futures_util::FutureExt;
use scriptbox_common::{ExecutionRequest, Language, TestCase, TestOutcome, TestSuiteResult};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{info, instrument, warn};

#[instrument(skip(engine, code, language, cases), fields(language = %language, test_count = cases.len()))]
pub async fn run_suite(
    engine: &Engine,
    code: &str,
    language: &Language,
    cases: &[TestCase],
) -> TestSuiteResult {
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let outcome = run_case(engine, code, language, case).await;
        if !outcome.passed {
            warn!(
                test_name = %outcome.name,
                error_kind = ?outcome.error_kind,
                elapsed_ms = outcome.elapsed_ms,
                "Test case failed"
            );
        }
        outcomes.push(outcome);
    }

    let suite = evaluator::summarize(outcomes, started.elapsed().as_millis() as u64);
    info!(
        passed = suite.passed_count,
        failed = suite.failed_count,
        total = suite.total_count,
        total_elapsed_ms = suite.total_elapsed_ms,
        "Test suite finished"
    );
    suite
}

async fn run_case(engine: &Engine, code: &str, language: &Language, case: &TestCase) -> TestOutcome {
    let request = ExecutionRequest::new(code, language.clone()).with_input(case.input.as_str());
    let started = Instant::now();

    match AssertUnwindSafe(engine.run(&request)).catch_unwind().await {
        Ok(result) => evaluator::evaluate_case(case, result),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "execution panicked".to_string());
            warn!(test_name = %case.name, panic = %message, "Test case execution panicked");
            evaluator::internal_failure(case, &message, started.elapsed().as_millis() as u64)
        }
    }
}
