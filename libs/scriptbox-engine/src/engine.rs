//! Execution Engine - single entry point for running a snippet
//!
//! **Responsibility:**
//! Apply the size guardrails, route the request to the adapter for its
//! language and turn every failure into a structured [`ExecutionResult`].
//!
//! Callers never see an `Err` and never see a panic caused by user code.

use crate::error::{EngineError, Result};
use crate::executor;
use crate::runtime::{self, markup, JavaScriptRuntime, PythonRuntime};
use scriptbox_common::{
    EngineConfig, ExecutionRequest, ExecutionResult, Language, TestCase, TestSuiteResult,
};
use std::time::Instant;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    javascript: JavaScriptRuntime,
    python: PythonRuntime,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            javascript: JavaScriptRuntime::new(&config),
            python: PythonRuntime::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one request to completion.
    ///
    /// `elapsed_ms` covers the whole call, including interpreter loading on
    /// the first Python run.
    #[instrument(skip(self, request), fields(request_id = %request.id, language = %request.language))]
    pub async fn run(&self, request: &ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();

        let result = match self.dispatch(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Execution failed inside the engine");
                ExecutionResult::failed(Vec::new(), e.kind(), e.to_string())
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(elapsed_ms, failed = result.is_error(), "Execution finished");
        result.with_elapsed(elapsed_ms)
    }

    /// Convenience wrapper building the request in place
    pub async fn run_code(&self, code: &str, language: impl Into<Language>, input: &str) -> ExecutionResult {
        let request = ExecutionRequest::new(code, language).with_input(input);
        self.run(&request).await
    }

    /// Run the same code once per test case, in order
    pub async fn run_suite(
        &self,
        code: &str,
        language: impl Into<Language>,
        cases: &[TestCase],
    ) -> TestSuiteResult {
        executor::run_suite(self, code, &language.into(), cases).await
    }

    async fn dispatch(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.check_limits(request)?;

        match &request.language {
            Language::JavaScript => self.javascript.execute(&request.code, &request.input, false).await,
            Language::TypeScript => self.javascript.execute(&request.code, &request.input, true).await,
            Language::Python => self.python.execute(&request.code, &request.input).await,
            Language::Html => Ok(markup::render(&request.code)),
            Language::Unsupported(tag) => {
                debug!(tag = %tag, "Unsupported language requested");
                Ok(ExecutionResult::ok(vec![runtime::unsupported_message(tag)]))
            }
        }
    }

    fn check_limits(&self, request: &ExecutionRequest) -> Result<()> {
        if request.code.len() > self.config.max_source_bytes {
            warn!(
                source_bytes = request.code.len(),
                max_source_bytes = self.config.max_source_bytes,
                "Rejecting oversized source"
            );
            return Err(EngineError::Rejected(format!(
                "Source code too large: {} bytes (max {} bytes)",
                request.code.len(),
                self.config.max_source_bytes
            )));
        }
        if request.input.len() > self.config.max_input_bytes {
            warn!(
                input_bytes = request.input.len(),
                max_input_bytes = self.config.max_input_bytes,
                "Rejecting oversized input"
            );
            return Err(EngineError::Rejected(format!(
                "Input too large: {} bytes (max {} bytes)",
                request.input.len(),
                self.config.max_input_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbox_common::ErrorKind;

    #[tokio::test]
    async fn test_unsupported_language_is_informational() {
        let result = Engine::default().run_code("fn main() {}", "rust", "").await;
        assert_eq!(result.error, None);
        assert_eq!(
            result.output_lines,
            vec!["Language 'rust' is not supported. Supported languages: javascript, typescript, python, html"]
        );
    }

    #[tokio::test]
    async fn test_oversized_source_is_rejected() {
        let config = EngineConfig {
            max_source_bytes: 8,
            ..EngineConfig::default()
        };
        let result = Engine::new(config).run_code("console.log('too long')", "javascript", "").await;
        assert_eq!(result.error_kind, Some(ErrorKind::InputRejected));
        assert!(result.output_lines.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_input_is_rejected() {
        let config = EngineConfig {
            max_input_bytes: 2,
            ..EngineConfig::default()
        };
        let result = Engine::new(config).run_code("1", "javascript", "abc").await;
        assert_eq!(result.error_kind, Some(ErrorKind::InputRejected));
        assert_eq!(result.error.as_deref(), Some("Input too large: 3 bytes (max 2 bytes)"));
    }

    #[tokio::test]
    async fn test_html_passthrough() {
        let result = Engine::default().run_code("<b>x</b>", "html", "").await;
        assert_eq!(result.error, None);
        assert!(result.output_lines.contains(&"<b>x</b>".to_string()));
    }
}
