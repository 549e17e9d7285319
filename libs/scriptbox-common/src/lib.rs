pub mod config;
pub mod types;

pub use config::EngineConfig;
pub use types::{
    ErrorKind, ExecutionRequest, ExecutionResult, Language, TestCase, TestOutcome,
    TestSuiteResult,
};
