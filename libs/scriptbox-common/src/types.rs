use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Language tag of a submission.
///
/// Unknown tags are kept verbatim in `Unsupported` so the engine can echo them
/// back in its informational result instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Html,
    Unsupported(String),
}

impl Language {
    /// Canonical tags of every language the engine can run, in display order
    pub const SUPPORTED: [&'static str; 4] = ["javascript", "typescript", "python", "html"];

    /// Parse a language tag (case-insensitive, common aliases accepted)
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "javascript" | "js" | "jsx" | "mjs" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "python" | "py" | "python3" => Language::Python,
            "html" | "htm" => Language::Html,
            _ => Language::Unsupported(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Html => "html",
            Language::Unsupported(tag) => tag,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Language::Unsupported(_))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Language {
    fn from(tag: String) -> Self {
        Language::from_tag(&tag)
    }
}

impl From<&str> for Language {
    fn from(tag: &str) -> Self {
        Language::from_tag(tag)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}

/// One unit of work for the engine. Built fresh per call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub input: String,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, language: impl Into<Language>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            language: language.into(),
            input: String::new(),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }
}

/// Classification of a failed execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Submitted code threw (or failed to parse)
    UserCode,
    /// TypeScript source no longer parses after type stripping
    TransformMismatch,
    /// The Python interpreter could not be brought up
    InterpreterLoad,
    /// Submitted Python code raised
    InterpreterRuntime,
    /// Execution was stopped after exceeding the time limit
    TimedOut,
    /// Execution was stopped after exceeding the memory limit
    ResourceExhausted,
    /// Source or input exceeded the configured size limits
    InputRejected,
    /// Failure inside the engine itself
    Internal,
}

/// Result of running one snippet.
///
/// `output_lines` and `error` are not exclusive: output captured before a
/// failure is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output_lines: Vec<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    pub fn ok(output_lines: Vec<String>) -> Self {
        Self {
            output_lines,
            ..Default::default()
        }
    }

    pub fn failed(output_lines: Vec<String>, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            output_lines,
            error: Some(error.into()),
            error_kind: Some(kind),
            elapsed_ms: 0,
        }
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Output lines joined the way a terminal would show them
    pub fn stdout(&self) -> String {
        self.output_lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub input: String,
    #[serde(alias = "expected", alias = "expectedOutput")]
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>, input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected_output: expected.into(),
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub outcomes: Vec<TestOutcome>,
    pub passed_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    pub total_elapsed_ms: u64,
}

impl TestSuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed_count == 0
    }

    /// Outcomes that may be shown to the submitter
    pub fn visible_outcomes(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.hidden)
    }
}
