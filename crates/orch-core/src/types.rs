use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sentinel tool name an LLM uses to admit that no catalogued tool fits its
/// need. Reserved: no real tool may register under this name.
pub const MISSING_TOOL: &str = "MISSING_TOOL";

/// A session identifier. Restricted at construction time to a single
/// filename-safe path component so it can be used directly as a directory
/// name under `cache/` without further validation at each call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Accepts ASCII alphanumeric, `-`, and `_` only; rejects anything that
    /// could act as a path separator or traversal segment.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidSessionId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidSessionId(raw));
        }
        let valid = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid || raw == "." || raw == ".." {
            return Err(InvalidSessionId(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid session id '{0}'")]
pub struct InvalidSessionId(pub String);

/// Scalar parameter value a tool may receive. The dispatcher validates these
/// against a tool's declared [`ParamKind`] before invoking the tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::String(_) => ParamKind::String,
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Bool(_) => ParamKind::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{s}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(fl) => write!(f, "{fl}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Bool,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
        };
        write!(f, "{s}")
    }
}

/// One declared parameter of a tool, as advertised to the LLM.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Immutable, built once at registration time and never mutated afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub requires_network: bool,
    pub requires_filesystem: bool,
    pub alternative_methods: Vec<String>,
    pub parameters: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c == tag)
    }
}

/// Per-invocation context handed to a tool by the dispatcher.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    pub session_id: Option<SessionId>,
    pub parameters: HashMap<String, ParamValue>,
    /// Free-form values shared across tools within one reasoning loop, e.g.
    /// a downloader tool publishing `repoPath` for a later analyzer tool to
    /// consume. See the `repoPath` pattern note: this coupling is real and
    /// undeclared, prefer typed slots for anything new.
    pub state: HashMap<String, String>,
    /// Set by the dispatcher when retrying via an alternative method.
    pub method_override: Option<String>,
}

impl ToolContext {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            parameters: HashMap::new(),
            state: HashMap::new(),
            method_override: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}

/// Outcome of one tool invocation. Ephemeral — not persisted beyond the
/// history entry that embeds it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub method_used: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>, method_used: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            duration_ms,
            method_used: method_used.into(),
        }
    }

    pub fn failed(error: impl Into<String>, method_used: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            duration_ms,
            method_used: method_used.into(),
        }
    }
}

/// The parsed, validated outcome of one LLM turn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub task_complete: bool,
    pub response: Option<String>,
    pub requires_tool: bool,
    pub tool: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, ParamValue>,
    pub next_step: Option<String>,
    pub reasoning: Option<String>,
    pub confidence: Option<f64>,
    pub assumptions: Vec<String>,
    pub risks: Vec<String>,
    /// Unrecognized keys encountered while parsing, preserved rather than
    /// dropped so a human (or the next prompt) can see what was ignored.
    #[serde(default)]
    pub diagnostics: HashMap<String, String>,
}

impl DecisionRecord {
    /// Checks the well-formedness rules from the data model: a complete
    /// decision must carry a response and not also request a tool; a
    /// tool-requesting decision must name a tool. Violations are reported,
    /// not fatal — the loop still gets the record back so it can recover.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.task_complete {
            if self.response.as_deref().unwrap_or("").trim().is_empty() {
                problems.push("taskComplete=true but response is empty".to_string());
            }
            if self.requires_tool {
                problems.push("taskComplete=true but requiresTool=true".to_string());
            }
        }
        if self.requires_tool && self.tool.as_deref().unwrap_or("").trim().is_empty() {
            problems.push("requiresTool=true but tool is empty".to_string());
        }
        if !self.task_complete
            && !self.requires_tool
            && self.next_step.as_deref().unwrap_or("").trim().is_empty()
        {
            problems.push("no taskComplete, no requiresTool, and nextStep is empty".to_string());
        }
        problems
    }

    pub fn is_well_formed(&self) -> bool {
        self.validate().is_empty()
    }
}

/// One round-trip: the prompt sent, the raw LLM text, the parsed decision,
/// and the tool result if a tool was invoked.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub iteration: u32,
    pub prompt: String,
    pub raw_response: String,
    pub decision: DecisionRecord,
    pub tool_result: Option<ToolResult>,
}

/// Append-only record of a session's reasoning-loop iterations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InteractionHistory {
    pub entries: Vec<HistoryEntry>,
}

impl InteractionHistory {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn last_non_empty_response(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find_map(|e| e.decision.response.as_deref().filter(|r| !r.trim().is_empty()))
    }

    /// A truncated view suitable for replay into the next prompt: the most
    /// recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }
}

/// Reasoning-loop mode, selected by the CLI's optional second argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Single,
    Collaborative,
    Intelligent,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Collaborative => "collaborative",
            Mode::Intelligent => "intelligent",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Mode::Single),
            "collaborative" => Ok(Mode::Collaborative),
            "intelligent" => Ok(Mode::Intelligent),
            other => Err(InvalidMode(other.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mode '{0}', expected one of: single, collaborative, intelligent")]
pub struct InvalidMode(pub String);
