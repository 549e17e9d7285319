//! Test Evaluator - Language-Agnostic Comparison Logic
//!
//! **Core Responsibility:**
//! Compare an execution result against a test case's expected output.
//!
//! **Critical Properties:**
//! - Knows nothing about V8 or the Python interpreter
//! - Pure function: (execution result, expected output) → outcome
//!
//! **Normalization Rules (applied to both sides):**
//! - `\r\n` and lone `\r` become `\n`
//! - Trailing whitespace is stripped from every line
//! - Leading and trailing blank lines are dropped
//! - Case and internal whitespace are significant
//!
//! A result carrying an error compares as `"Error: <message>"`, so a test
//! can expect a specific failure.

use scriptbox_common::{ExecutionResult, TestCase, TestOutcome, TestSuiteResult};

pub const ERROR_PREFIX: &str = "Error: ";

/// Normalize output text for comparison. Idempotent.
pub fn normalize_output(output: &str) -> String {
    output
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// The text a test case is judged on
pub fn actual_output(result: &ExecutionResult) -> String {
    match &result.error {
        Some(error) => format!("{}{}", ERROR_PREFIX, error),
        None => result.stdout().trim().to_string(),
    }
}

/// Evaluate a single test case execution
pub fn evaluate_case(case: &TestCase, result: ExecutionResult) -> TestOutcome {
    let actual = actual_output(&result);
    let passed = normalize_output(&actual) == normalize_output(&case.expected_output);

    TestOutcome {
        name: case.name.clone(),
        passed,
        expected: case.expected_output.clone(),
        actual,
        elapsed_ms: result.elapsed_ms,
        error: result.error,
        error_kind: result.error_kind,
        hidden: case.hidden,
    }
}

/// Outcome for a case whose execution never produced a result
pub fn internal_failure(case: &TestCase, message: &str, elapsed_ms: u64) -> TestOutcome {
    let error = format!("internal error: {}", message);
    TestOutcome {
        name: case.name.clone(),
        passed: false,
        expected: case.expected_output.clone(),
        actual: format!("{}{}", ERROR_PREFIX, error),
        elapsed_ms,
        error: Some(error),
        error_kind: Some(scriptbox_common::ErrorKind::Internal),
        hidden: case.hidden,
    }
}

/// Aggregate outcomes, keeping their order
pub fn summarize(outcomes: Vec<TestOutcome>, total_elapsed_ms: u64) -> TestSuiteResult {
    let passed_count = outcomes.iter().filter(|outcome| outcome.passed).count();
    let total_count = outcomes.len();

    TestSuiteResult {
        outcomes,
        passed_count,
        failed_count: total_count - passed_count,
        total_count,
        total_elapsed_ms,
    }
}
