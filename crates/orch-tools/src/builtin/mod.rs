//! The built-in tool catalogue: a handful of filesystem and arithmetic
//! tools grounded directly in the session sandbox, enough to exercise the
//! dispatcher's fallback chain and the `MISSING_TOOL` reflection path in
//! spec.md §8's boundary scenarios.

mod arithmetic;
mod directory;
mod file_reader;
mod file_writer;
mod fs_analyzer;
mod repo_download;

pub use arithmetic::ArithmeticTool;
pub use directory::{DirectoryCreate, DirectoryList};
pub use file_reader::FileReader;
pub use file_writer::FileWriter;
pub use fs_analyzer::FileSystemAnalyzer;
pub use repo_download::RepoDownload;

use std::sync::Arc;

use crate::registry::ToolRegistry;
use crate::RegistryError;
use orch_sandbox::Sandbox;

/// Registers every built-in tool against `sandbox` into a fresh registry.
/// Startup wiring calls this once; duplicate registration is a bug, not a
/// recoverable condition, so it panics via `expect` at the call site rather
/// than threading an error through every caller.
pub fn register_all(sandbox: Arc<Sandbox>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ArithmeticTool::new()))?;
    registry.register(Arc::new(FileReader::new(sandbox.clone())))?;
    registry.register(Arc::new(FileWriter::new(sandbox.clone())))?;
    registry.register(Arc::new(DirectoryCreate::new(sandbox.clone())))?;
    registry.register(Arc::new(DirectoryList::new(sandbox.clone())))?;
    registry.register(Arc::new(FileSystemAnalyzer::new(sandbox.clone())))?;
    registry.register(Arc::new(RepoDownload::new(sandbox)))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_all_produces_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let registry = register_all(sandbox).unwrap();
        assert!(registry.lookup("filereader").is_some());
        assert!(registry.lookup("arithmetictool").is_some());
        assert!(registry.lookup("repodownload").is_some());
    }
}
