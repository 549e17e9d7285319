//! Sandboxed execution of short JavaScript, TypeScript and Python snippets,
//! with output capture and a sequential test harness.

pub mod console;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod runtime;
pub mod transform;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use evaluator::normalize_output;
pub use transform::strip_type_annotations;
