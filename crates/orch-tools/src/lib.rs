//! Tool Registry & Metadata (spec.md §4.B).
//!
//! Holds tool instances, indexes them by name and by capability tag, and
//! exposes a reflection-free catalogue the prompt builder can embed
//! verbatim into the LLM's system prompt. Also ships the built-in tool
//! catalogue the dispatcher serves out of the box.

pub mod builtin;
pub mod registry;
pub mod tool;

pub use registry::{levenshtein, ToolRegistry};
pub use tool::{Tool, ToolDescriptorBuilder};

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("a tool named '{0}' is already registered")]
    DuplicateName(String),
    #[error("'{0}' collides with the reserved MISSING_TOOL sentinel name")]
    ReservedName(String),
}
