use scriptbox_common::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("JavaScript runtime error: {0}")]
    JavaScript(String),

    #[error("Python interpreter failed to load: {0}")]
    InterpreterLoad(String),

    #[error("Python error: {0}")]
    Python(String),

    #[error("Malformed sandbox report: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Execution task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Rejected(String),
}

impl EngineError {
    /// Classification reported back to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InterpreterLoad(_) => ErrorKind::InterpreterLoad,
            EngineError::Python(_) => ErrorKind::InterpreterRuntime,
            EngineError::Rejected(_) => ErrorKind::InputRejected,
            EngineError::JavaScript(_) | EngineError::Protocol(_) | EngineError::Join(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<pyo3::PyErr> for EngineError {
    fn from(err: pyo3::PyErr) -> Self {
        EngineError::Python(err.to_string())
    }
}
