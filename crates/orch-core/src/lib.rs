//! Shared data model and error taxonomy for the agent orchestrator.
//!
//! Every other crate in the workspace depends on this one; this one depends
//! on nothing in the workspace.

pub mod error;
pub mod types;

pub use error::OrchestratorError;
pub use types::{
    DecisionRecord, HistoryEntry, InteractionHistory, InvalidMode, InvalidSessionId, Mode,
    ParamKind, ParamSpec, ParamValue, SessionId, ToolContext, ToolDescriptor, ToolResult,
    MISSING_TOOL,
};
