//! The error taxonomy shared across every orchestrator crate.
//!
//! Each subsystem (config, sandbox, dispatcher, parser, llm client, loop)
//! defines its own error enum for the failures only it can produce, then
//! converts into [`OrchestratorError`] at the boundary where the reasoning
//! loop or the CLI needs one flat type to report to the user.

#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error("tool '{tool}' parameter error: {message}")]
    ToolParameter { tool: String, message: String },

    #[error("tool '{tool}' execution failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("LLM transport error: {0}")]
    LlmTransport(String),

    #[error("response parse error: {0}")]
    ResponseParse(String),

    #[error("operation cancelled")]
    Cancellation,
}

impl OrchestratorError {
    /// True for kinds the reasoning loop may retry within the same session
    /// rather than aborting the whole query.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            OrchestratorError::Configuration(_) | OrchestratorError::Cancellation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_configuration() {
        let err = OrchestratorError::Configuration("missing DefaultClient".into());
        assert_eq!(err.to_string(), "configuration error: missing DefaultClient");
    }

    #[test]
    fn display_session() {
        let err = OrchestratorError::Session("boundary violation".into());
        assert_eq!(err.to_string(), "session error: boundary violation");
    }

    #[test]
    fn display_tool_not_found() {
        let err = OrchestratorError::ToolNotFound("FileReader".into());
        assert_eq!(err.to_string(), "tool 'FileReader' not found");
    }

    #[test]
    fn display_tool_parameter() {
        let err = OrchestratorError::ToolParameter {
            tool: "FileReader".into(),
            message: "missing required parameter 'path'".into(),
        };
        assert_eq!(
            err.to_string(),
            "tool 'FileReader' parameter error: missing required parameter 'path'"
        );
    }

    #[test]
    fn display_tool_execution() {
        let err = OrchestratorError::ToolExecution {
            tool: "RepoDownload".into(),
            message: "network unreachable".into(),
        };
        assert_eq!(
            err.to_string(),
            "tool 'RepoDownload' execution failed: network unreachable"
        );
    }

    #[test]
    fn display_llm_transport() {
        let err = OrchestratorError::LlmTransport("connection refused".into());
        assert_eq!(err.to_string(), "LLM transport error: connection refused");
    }

    #[test]
    fn display_response_parse() {
        let err = OrchestratorError::ResponseParse("all strategies failed".into());
        assert_eq!(err.to_string(), "response parse error: all strategies failed");
    }

    #[test]
    fn display_cancellation() {
        assert_eq!(OrchestratorError::Cancellation.to_string(), "operation cancelled");
    }

    #[test]
    fn recoverable_classification() {
        assert!(!OrchestratorError::Configuration("x".into()).is_recoverable());
        assert!(!OrchestratorError::Cancellation.is_recoverable());
        assert!(OrchestratorError::ToolNotFound("x".into()).is_recoverable());
        assert!(OrchestratorError::ResponseParse("x".into()).is_recoverable());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OrchestratorError>();
    }
}
