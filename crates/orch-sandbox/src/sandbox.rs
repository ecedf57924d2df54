use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use orch_core::SessionId;

use crate::SandboxError;

/// Per-session rooted filesystem. Every operation a tool performs goes
/// through [`Sandbox::resolve_safe`], so no tool can ever touch a path
/// outside `cache/<sessionId>/` regardless of what the LLM asked for.
pub struct Sandbox {
    cache_root: PathBuf,
    current_dirs: Mutex<HashMap<SessionId, PathBuf>>,
}

impl Sandbox {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            current_dirs: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: creates `cache/<id>/` on first call.
    pub fn session_root(&self, id: &SessionId) -> Result<PathBuf, SandboxError> {
        let root = self.cache_root.join(id.as_str());
        std::fs::create_dir_all(&root)
            .map_err(|e| SandboxError::Io(root.display().to_string(), e.to_string()))?;
        Ok(root)
    }

    /// Always the session root; used when a tool needs a working directory
    /// but the LLM did not pick one, so external subprocesses never start
    /// higher up the tree than the session itself.
    pub fn safe_working_directory(&self, id: &SessionId) -> Result<PathBuf, SandboxError> {
        self.session_root(id)
    }

    pub fn current_dir(&self, id: &SessionId) -> Result<PathBuf, SandboxError> {
        let root = self.session_root(id)?;
        let mut dirs = self.current_dirs.lock().expect("current_dirs poisoned");
        Ok(dirs.entry(id.clone()).or_insert(root).clone())
    }

    /// Resolves `relative` against the session's current directory, creates
    /// it if missing, and fails if the resolved canonical path escapes the
    /// session root. Relocates the session's current directory to the
    /// created target; tools that only want to create a directory without
    /// navigating into it should use [`Sandbox::create_dir`] instead.
    pub fn change_dir(&self, id: &SessionId, relative: &str) -> Result<PathBuf, SandboxError> {
        let target = self.create_dir(id, relative)?;
        let mut dirs = self.current_dirs.lock().expect("current_dirs poisoned");
        dirs.insert(id.clone(), target.clone());
        Ok(target)
    }

    /// Resolves `relative` against the session's current directory and
    /// creates it (and any missing parents) if missing, without moving the
    /// session's current directory. Fails if the resolved canonical path
    /// escapes the session root.
    pub fn create_dir(&self, id: &SessionId, relative: &str) -> Result<PathBuf, SandboxError> {
        let target = self.resolve_safe(id, relative)?;
        std::fs::create_dir_all(&target)
            .map_err(|e| SandboxError::Io(target.display().to_string(), e.to_string()))?;
        Ok(target)
    }

    /// The containment algorithm: lexically normalize the candidate path
    /// (without touching the filesystem, since the target may not exist
    /// yet), then accept iff the normalized path is the session root or
    /// starts with `root + separator`. Absolute paths supplied by the
    /// caller are rejected outright, as are any paths whose normalized
    /// form still carries a leading `..` after joining against the root.
    pub fn resolve_safe(&self, id: &SessionId, relative: &str) -> Result<PathBuf, SandboxError> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            tracing::warn!(session = %id, path = relative, "boundary violation: absolute path rejected");
            return Err(SandboxError::BoundaryViolation {
                session: id.to_string(),
                path: relative.to_string(),
            });
        }

        let root = self.session_root(id)?;
        let base = self.current_dir(id)?;
        let joined = base.join(candidate);
        let normalized = lexical_normalize(&joined);

        if normalized == root || normalized.starts_with(&root) {
            return Ok(normalized);
        }

        tracing::warn!(
            session = %id,
            path = relative,
            root = %root.display(),
            "boundary violation: path escapes session root"
        );
        Err(SandboxError::BoundaryViolation {
            session: id.to_string(),
            path: relative.to_string(),
        })
    }

    /// Non-raising variant for tools that want to pre-check a path before
    /// attempting an operation on it.
    pub fn is_within_boundary(&self, id: &SessionId, relative: &str) -> bool {
        self.resolve_safe(id, relative).is_ok()
    }

    pub fn read(&self, id: &SessionId, relative: &str) -> Result<Vec<u8>, SandboxError> {
        let path = self.resolve_safe(id, relative)?;
        std::fs::read(&path).map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))
    }

    pub fn read_to_string(&self, id: &SessionId, relative: &str) -> Result<String, SandboxError> {
        let bytes = self.read(id, relative)?;
        String::from_utf8(bytes)
            .map_err(|e| SandboxError::Io(relative.to_string(), format!("not valid UTF-8: {e}")))
    }

    pub fn write(&self, id: &SessionId, relative: &str, contents: &[u8]) -> Result<(), SandboxError> {
        let path = self.resolve_safe(id, relative)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SandboxError::Io(parent.display().to_string(), e.to_string()))?;
        }
        std::fs::write(&path, contents)
            .map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))
    }

    pub fn append(&self, id: &SessionId, relative: &str, contents: &[u8]) -> Result<(), SandboxError> {
        use std::io::Write;
        let path = self.resolve_safe(id, relative)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SandboxError::Io(parent.display().to_string(), e.to_string()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))?;
        file.write_all(contents)
            .map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))
    }

    pub fn list_files(&self, id: &SessionId, relative: &str) -> Result<Vec<String>, SandboxError> {
        self.list(id, relative, false)
    }

    pub fn list_dirs(&self, id: &SessionId, relative: &str) -> Result<Vec<String>, SandboxError> {
        self.list(id, relative, true)
    }

    fn list(&self, id: &SessionId, relative: &str, dirs_only: bool) -> Result<Vec<String>, SandboxError> {
        let path = self.resolve_safe(id, relative)?;
        let entries = std::fs::read_dir(&path)
            .map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir == dirs_only {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, id: &SessionId, relative: &str) -> Result<(), SandboxError> {
        let path = self.resolve_safe(id, relative)?;
        if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        }
        .map_err(|e| SandboxError::Io(path.display().to_string(), e.to_string()))
    }

    pub fn copy(&self, id: &SessionId, from: &str, to: &str) -> Result<(), SandboxError> {
        let src = self.resolve_safe(id, from)?;
        let dst = self.resolve_safe(id, to)?;
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SandboxError::Io(parent.display().to_string(), e.to_string()))?;
        }
        std::fs::copy(&src, &dst)
            .map(|_| ())
            .map_err(|e| SandboxError::Io(dst.display().to_string(), e.to_string()))
    }

    pub fn move_path(&self, id: &SessionId, from: &str, to: &str) -> Result<(), SandboxError> {
        let src = self.resolve_safe(id, from)?;
        let dst = self.resolve_safe(id, to)?;
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SandboxError::Io(parent.display().to_string(), e.to_string()))?;
        }
        std::fs::rename(&src, &dst)
            .map_err(|e| SandboxError::Io(dst.display().to_string(), e.to_string()))
    }

    /// Recursive delete of the session root. Idempotent: deleting an
    /// already-absent session root is not an error.
    pub fn cleanup(&self, id: &SessionId) -> Result<(), SandboxError> {
        let root = self.cache_root.join(id.as_str());
        match std::fs::remove_dir_all(&root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SandboxError::Io(root.display().to_string(), e.to_string())),
        }
        self.current_dirs.lock().expect("current_dirs poisoned").remove(id);
        Ok(())
    }
}

/// Collapses `.` and `..` components without touching the filesystem, so it
/// works for paths that do not exist yet (canonicalize alone cannot).
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
