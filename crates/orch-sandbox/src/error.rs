#[derive(thiserror::Error, Debug)]
pub enum SandboxError {
    #[error("path '{path}' escapes session '{session}' root")]
    BoundaryViolation { session: String, path: String },

    #[error("I/O error at '{0}': {1}")]
    Io(String, String),
}

impl From<SandboxError> for orch_core::OrchestratorError {
    fn from(err: SandboxError) -> Self {
        orch_core::OrchestratorError::Session(err.to_string())
    }
}
