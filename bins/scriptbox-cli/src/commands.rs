// CLI commands for scriptbox
use anyhow::{bail, Context, Result};
use scriptbox_common::{EngineConfig, ExecutionResult, Language, TestCase, TestSuiteResult};
use scriptbox_engine::{strip_type_annotations, Engine};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub fn read_source(file: Option<&Path>, code: Option<String>) -> Result<String> {
    match (file, code) {
        (Some(path), _) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        (None, Some(code)) => Ok(code),
        (None, None) => bail!("Either --file or --code is required"),
    }
}

pub fn read_input(input: Option<String>, input_file: Option<&Path>) -> Result<String> {
    match (input, input_file) {
        (Some(input), _) => Ok(input),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        (None, None) => Ok(String::new()),
    }
}

fn load_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let cases: Vec<TestCase> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases in {}", path.display()))?;
    info!(path = %path.display(), test_count = cases.len(), "Loaded test cases");
    Ok(cases)
}

fn print_result(result: &ExecutionResult) {
    for line in &result.output_lines {
        println!("{}", line);
    }
    if let Some(error) = &result.error {
        eprintln!("✗ {}", error);
    }
}

pub async fn run(config: EngineConfig, code: &str, language: &str, input: &str, json: bool) -> Result<()> {
    let engine = Engine::new(config);
    let result = engine.run_code(code, language, input).await;
    debug!(
        language = %language,
        error_kind = ?result.error_kind,
        elapsed_ms = result.elapsed_ms,
        "Run finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_suite(suite: &TestSuiteResult, show_hidden: bool) {
    for outcome in &suite.outcomes {
        let mark = if outcome.passed { "✓" } else { "✗" };
        println!("{} {} ({}ms)", mark, outcome.name, outcome.elapsed_ms);

        if outcome.passed || (outcome.hidden && !show_hidden) {
            continue;
        }
        println!("    expected: {:?}", outcome.expected);
        println!("    actual:   {:?}", outcome.actual);
    }
    println!();
    println!(
        "{}/{} passed in {}ms",
        suite.passed_count, suite.total_count, suite.total_elapsed_ms
    );
}

/// Returns whether every case passed
pub async fn test(
    config: EngineConfig,
    file: &Path,
    language: &str,
    cases_path: &Path,
    json: bool,
    show_hidden: bool,
) -> Result<bool> {
    let code = read_source(Some(file), None)?;
    let cases = load_cases(cases_path)?;
    if cases.is_empty() {
        bail!("No test cases found in {}", cases_path.display());
    }

    let engine = Engine::new(config);
    let suite = engine.run_suite(&code, language, &cases).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&suite)?);
    } else {
        print_suite(&suite, show_hidden);
    }
    Ok(suite.all_passed())
}

pub fn transform(file: &Path) -> Result<()> {
    let source = read_source(Some(file), None)?;
    print!("{}", strip_type_annotations(&source));
    Ok(())
}

pub fn languages() {
    for tag in Language::SUPPORTED {
        println!("{}", tag);
    }
}
