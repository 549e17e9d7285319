//! Per-language execution strategies.

pub mod javascript;
pub mod markup;
pub mod python;

pub use javascript::JavaScriptRuntime;
pub use python::{PythonInterpreter, PythonRuntime};

pub fn timeout_message(timeout_ms: u128) -> String {
    format!("TimeoutError: execution exceeded {}ms", timeout_ms)
}

/// Informational line for a language tag nothing can run
pub fn unsupported_message(tag: &str) -> String {
    format!(
        "Language '{}' is not supported. Supported languages: {}",
        tag,
        scriptbox_common::Language::SUPPORTED.join(", ")
    )
}
