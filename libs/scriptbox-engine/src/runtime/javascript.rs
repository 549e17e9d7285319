use super::timeout_message;
use crate::console::{format_value, ConsoleRecord, ConsoleValue, OutputCapture};
use crate::error::{EngineError, Result};
use crate::transform;
use once_cell::sync::Lazy;
use scriptbox_common::{EngineConfig, ErrorKind, ExecutionResult};
use serde::Deserialize;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const PRELUDE: &str = include_str!("prelude.js");
const COLLECT_SCRIPT: &str = "__scriptbox.collect()";
pub const TRANSFORM_MISMATCH_NOTE: &str = "[TypeScript transform produced invalid JavaScript]";

static V8_PLATFORM: Lazy<()> = Lazy::new(|| {
    let platform = v8::new_default_platform(0, false).make_shared();
    v8::V8::initialize_platform(platform);
    v8::V8::initialize();
    info!("V8 platform initialized");
});

/// What the prelude reports back after a run
#[derive(Debug, Deserialize)]
struct SandboxReport {
    #[serde(default)]
    records: Vec<ConsoleRecord>,
    returned: Option<ConsoleValue>,
    error: Option<ThrownError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ErrorPhase {
    Compile,
    Runtime,
}

#[derive(Debug, Deserialize)]
struct ThrownError {
    name: String,
    message: String,
    line: Option<u32>,
    column: Option<u32>,
    phase: ErrorPhase,
}

impl ThrownError {
    /// `Name: message (line L:C)`, position only when the stack had one
    fn describe(&self) -> String {
        let mut text = if self.message.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.message)
        };
        match (self.line, self.column) {
            (Some(line), Some(column)) => text.push_str(&format!(" (line {}:{})", line, column)),
            (Some(line), None) => text.push_str(&format!(" (line {})", line)),
            _ => {}
        }
        text
    }

    fn is_syntax_error(&self) -> bool {
        self.phase == ErrorPhase::Compile && self.name == "SyntaxError"
    }
}

impl SandboxReport {
    fn capture(&self) -> OutputCapture {
        let mut capture = OutputCapture::new();
        for record in &self.records {
            capture.record(record);
        }
        capture
    }

    /// Console output recorded before the run was cut short
    fn partial_lines(&self) -> Vec<String> {
        self.capture().finish()
    }

    fn into_result(self, typescript: bool) -> ExecutionResult {
        let mut capture = self.capture();
        if let Some(value) = &self.returned {
            capture.push_line(&format_value(value));
        }
        let lines = capture.finish();

        match self.error {
            None => ExecutionResult::ok(lines),
            Some(thrown) if typescript && thrown.is_syntax_error() => ExecutionResult::failed(
                lines,
                ErrorKind::TransformMismatch,
                format!("{} {}", thrown.describe(), TRANSFORM_MISMATCH_NOTE),
            ),
            Some(thrown) => ExecutionResult::failed(lines, ErrorKind::UserCode, thrown.describe()),
        }
    }
}

enum IsolateOutcome {
    Completed(SandboxReport),
    /// Terminated before finishing; carries what was recorded up to then
    Interrupted(Option<SandboxReport>),
    MemoryExhausted(Option<SandboxReport>),
}

fn partial_lines(report: Option<SandboxReport>) -> Vec<String> {
    report.map(|report| report.partial_lines()).unwrap_or_default()
}

/// Shared with the near-heap-limit callback
#[derive(Default)]
struct HeapGuard {
    handle: OnceLock<v8::IsolateHandle>,
    exhausted: AtomicBool,
}

extern "C" fn near_heap_limit(
    data: *mut c_void,
    current_heap_limit: usize,
    _initial_heap_limit: usize,
) -> usize {
    // SAFETY: `data` points at the HeapGuard declared before the isolate in
    // `run_isolate`, so it outlives every callback invocation.
    let guard = unsafe { &*(data as *const HeapGuard) };
    guard.exhausted.store(true, Ordering::SeqCst);
    if let Some(handle) = guard.handle.get() {
        handle.terminate_execution();
    }
    // Headroom so the termination can unwind instead of aborting the process
    current_heap_limit.saturating_mul(2)
}

/// JavaScript / TypeScript adapter backed by V8.
///
/// Every execution gets its own isolate and context, created on a blocking
/// thread. Nothing survives between runs.
#[derive(Debug, Clone)]
pub struct JavaScriptRuntime {
    heap_limit_bytes: usize,
    timeout: Duration,
}

impl JavaScriptRuntime {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            heap_limit_bytes: config.js_heap_limit_mb.saturating_mul(1024 * 1024),
            timeout: config.timeout(),
        }
    }

    pub async fn execute(&self, code: &str, input: &str, typescript: bool) -> Result<ExecutionResult> {
        let source = if typescript {
            transform::strip_type_annotations(code)
        } else {
            code.to_string()
        };
        let script = build_script(&source, input)?;

        let heap_limit_bytes = self.heap_limit_bytes;
        let (handle_tx, handle_rx) = oneshot::channel();
        let mut task =
            tokio::task::spawn_blocking(move || run_isolate(&script, heap_limit_bytes, handle_tx));

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => match joined?? {
                IsolateOutcome::Completed(report) => Ok(report.into_result(typescript)),
                IsolateOutcome::MemoryExhausted(report) => {
                    warn!(heap_limit_bytes, "JavaScript execution exceeded heap limit");
                    Ok(ExecutionResult::failed(
                        partial_lines(report),
                        ErrorKind::ResourceExhausted,
                        format!(
                            "RangeError: memory limit of {}MB exceeded",
                            heap_limit_bytes / (1024 * 1024)
                        ),
                    ))
                }
                IsolateOutcome::Interrupted(_) => {
                    Err(EngineError::JavaScript("Sandbox run did not complete".into()))
                }
            },
            Err(_) => {
                let timeout_ms = self.timeout.as_millis();
                warn!(timeout_ms = timeout_ms as u64, "JavaScript execution timed out, terminating isolate");
                if let Ok(handle) = handle_rx.await {
                    handle.terminate_execution();
                }
                let partial = match task.await {
                    Ok(Ok(IsolateOutcome::Completed(report)))
                    | Ok(Ok(IsolateOutcome::Interrupted(Some(report))))
                    | Ok(Ok(IsolateOutcome::MemoryExhausted(Some(report)))) => report.partial_lines(),
                    Ok(Ok(_)) => Vec::new(),
                    Ok(Err(e)) => {
                        warn!(error = %e, "Could not read output of terminated isolate");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(error = %e, "Terminated isolate did not shut down cleanly");
                        Vec::new()
                    }
                };
                Ok(ExecutionResult::failed(
                    partial,
                    ErrorKind::TimedOut,
                    timeout_message(timeout_ms),
                ))
            }
        }
    }
}

/// Prelude plus the call that runs the submission. Source and input are
/// embedded as JSON string literals, which are valid JavaScript literals.
fn build_script(source: &str, input: &str) -> Result<String> {
    Ok(format!(
        "{PRELUDE}\n__scriptbox.run({}, {});\n",
        serde_json::to_string(source)?,
        serde_json::to_string(input)?
    ))
}

fn run_isolate(
    script: &str,
    heap_limit_bytes: usize,
    handle_tx: oneshot::Sender<v8::IsolateHandle>,
) -> Result<IsolateOutcome> {
    Lazy::force(&V8_PLATFORM);

    let guard = HeapGuard::default();
    let params = v8::CreateParams::default().heap_limits(0, heap_limit_bytes);
    let isolate = &mut v8::Isolate::new(params);
    let _ = guard.handle.set(isolate.thread_safe_handle());
    let _ = handle_tx.send(isolate.thread_safe_handle());
    isolate.add_near_heap_limit_callback(
        near_heap_limit,
        &guard as *const HeapGuard as *mut c_void,
    );

    let scope = std::pin::pin!(v8::HandleScope::new(isolate));
    let scope = &mut scope.init();
    let context = v8::Context::new(scope, Default::default());
    let scope = &mut v8::ContextScope::new(scope, context);

    let code = v8::String::new(scope, script)
        .ok_or_else(|| EngineError::JavaScript("Failed to create V8 string".into()))?;
    let setup = v8::Script::compile(scope, code, None)
        .ok_or_else(|| EngineError::JavaScript("Failed to compile sandbox prelude".into()))?;

    let completed = setup.run(scope).is_some();
    if completed {
        scope.perform_microtask_checkpoint();
    }
    let interrupted = !completed || scope.is_execution_terminating();
    if interrupted {
        // Lift the termination so the records gathered so far can still be read
        scope.cancel_terminate_execution();
    }

    let collected = v8::String::new(scope, COLLECT_SCRIPT)
        .and_then(|code| v8::Script::compile(scope, code, None))
        .and_then(|collect| collect.run(scope))
        .and_then(|report| report.to_string(scope))
        .map(|report| report.to_rust_string_lossy(scope));
    let report = match collected {
        Some(json) => {
            debug!(report_bytes = json.len(), "Collected sandbox report");
            Some(serde_json::from_str::<SandboxReport>(&json)?)
        }
        None => None,
    };

    if guard.exhausted.load(Ordering::SeqCst) {
        return Ok(IsolateOutcome::MemoryExhausted(report));
    }
    if interrupted {
        return Ok(IsolateOutcome::Interrupted(report));
    }
    report
        .map(IsolateOutcome::Completed)
        .ok_or_else(|| EngineError::JavaScript("Failed to collect sandbox report".into()))
}
