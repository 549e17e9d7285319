use super::timeout_message;
use crate::console::OutputCapture;
use crate::error::{EngineError, Result};
use pyo3::prelude::*;
use pyo3::types::PyModule;
use scriptbox_common::{EngineConfig, ErrorKind, ExecutionResult};
use std::ffi::CString;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

const HARNESS_SOURCE: &str = include_str!("harness.py");

static INTERPRETER: OnceCell<Arc<Mutex<PythonInterpreter>>> = OnceCell::const_new();

/// Process-wide embedded interpreter with the harness module compiled in.
///
/// Loaded on first use and never torn down. Callers go through the mutex so
/// only one submission owns the redirected standard streams at a time.
pub struct PythonInterpreter {
    harness: Py<PyModule>,
}

#[derive(Debug, Clone, PartialEq)]
struct HarnessOutput {
    stdout: String,
    stderr: String,
    error: Option<String>,
    timed_out: bool,
}

impl PythonInterpreter {
    fn load() -> Result<Self> {
        let source =
            CString::new(HARNESS_SOURCE).map_err(|e| EngineError::InterpreterLoad(e.to_string()))?;

        Python::attach(|py| -> PyResult<Self> {
            let harness = PyModule::from_code(
                py,
                &source,
                c"scriptbox_harness.py",
                c"scriptbox_harness",
            )?;
            let version: String = py.import("sys")?.getattr("version")?.extract()?;
            info!(
                version = version.lines().next().unwrap_or_default(),
                "Python interpreter loaded"
            );
            Ok(Self {
                harness: harness.unbind(),
            })
        })
        .map_err(|e| EngineError::InterpreterLoad(e.to_string()))
    }

    /// Shared instance, loading it on first call. Concurrent first callers
    /// wait on the same load; a failed load is retried by the next caller.
    pub async fn shared() -> Result<Arc<Mutex<PythonInterpreter>>> {
        INTERPRETER
            .get_or_try_init(|| async {
                let interpreter = tokio::task::spawn_blocking(Self::load).await??;
                Ok::<_, EngineError>(Arc::new(Mutex::new(interpreter)))
            })
            .await
            .cloned()
    }

    fn run(&mut self, code: &str, input: &str, timeout: Duration) -> Result<HarnessOutput> {
        Python::attach(|py| {
            let (stdout, stderr, error, timed_out) = self
                .harness
                .bind(py)
                .getattr("run")?
                .call1((code, input, timeout.as_secs_f64()))?
                .extract::<(String, String, Option<String>, bool)>()?;
            Ok(HarnessOutput {
                stdout,
                stderr,
                error,
                timed_out,
            })
        })
    }
}

impl HarnessOutput {
    fn into_result(self, timeout: Duration) -> ExecutionResult {
        let mut capture = OutputCapture::new();
        capture.push_stream(&self.stdout);

        if self.timed_out {
            return ExecutionResult::failed(
                capture.finish(),
                ErrorKind::TimedOut,
                timeout_message(timeout.as_millis()),
            );
        }

        match self.error {
            None => {
                capture.push_error_stream(&self.stderr);
                ExecutionResult::ok(capture.finish())
            }
            Some(description) => {
                let stderr = self.stderr.trim_end();
                let error = if stderr.is_empty() {
                    description
                } else {
                    stderr.to_string()
                };
                ExecutionResult::failed(capture.finish(), ErrorKind::InterpreterRuntime, error)
            }
        }
    }
}

/// Python adapter over the shared interpreter
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    timeout: Duration,
    grace: Duration,
}

impl PythonRuntime {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            timeout: config.timeout(),
            grace: config.python_grace(),
        }
    }

    pub async fn execute(&self, code: &str, input: &str) -> Result<ExecutionResult> {
        let interpreter = PythonInterpreter::shared()
            .await
            .inspect_err(|e| warn!(error = %e, "Python interpreter unavailable"))?;

        let code = code.to_string();
        let input = input.to_string();
        let timeout = self.timeout;

        // The deadline starts once this run owns the interpreter, not while queued
        let mut interpreter = interpreter.lock_owned().await;
        debug!("Acquired Python interpreter");
        let work = tokio::task::spawn_blocking(move || interpreter.run(&code, &input, timeout));

        match tokio::time::timeout(self.timeout + self.grace, work).await {
            Ok(output) => Ok(output??.into_result(timeout)),
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Python execution did not stop at its deadline, abandoning it"
                );
                Ok(ExecutionResult::failed(
                    Vec::new(),
                    ErrorKind::TimedOut,
                    timeout_message(timeout.as_millis()),
                ))
            }
        }
    }
}
