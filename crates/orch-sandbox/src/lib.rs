//! Per-session rooted filesystem with path-escape prevention.
//!
//! Every tool operation that touches the filesystem goes through
//! [`Sandbox::resolve_safe`] (directly or via one of its convenience
//! wrappers), so no tool can ever act outside `cache/<sessionId>/`
//! regardless of what paths the LLM proposes.

pub mod error;
pub mod sandbox;

pub use error::SandboxError;
pub use sandbox::Sandbox;
