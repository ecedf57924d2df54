use orch_core::{ParamKind, ParamSpec, ToolContext, ToolDescriptor, ToolResult};

/// A callable tool. Implementations are registered once at startup and live
/// for the process lifetime; `execute`/`execute_method` may be called from
/// many sessions concurrently, so implementations must not hold per-call
/// state anywhere but `ctx`.
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Runs the tool's primary method.
    fn execute(&self, ctx: &mut ToolContext) -> ToolResult;

    /// Runs a named alternative method. The default rejects every name,
    /// which is correct for tools that declare no alternatives.
    fn execute_method(&self, method: &str, ctx: &mut ToolContext) -> ToolResult {
        ToolResult::failed(
            format!("tool '{}' has no alternative method '{method}'", self.descriptor().name),
            method,
            0,
        )
    }
}

/// Builds a [`ToolDescriptor`] so each tool implementation describes itself
/// once, at its own definition site, instead of via a hand-maintained
/// central table.
pub struct ToolDescriptorBuilder {
    name: String,
    description: String,
    capabilities: Vec<String>,
    requires_network: bool,
    requires_filesystem: bool,
    alternative_methods: Vec<String>,
    parameters: Vec<ParamSpec>,
}

impl ToolDescriptorBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capabilities: Vec::new(),
            requires_network: false,
            requires_filesystem: false,
            alternative_methods: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.push(tag.into());
        self
    }

    pub fn requires_network(mut self) -> Self {
        self.requires_network = true;
        self
    }

    pub fn requires_filesystem(mut self) -> Self {
        self.requires_filesystem = true;
        self
    }

    pub fn alternative_method(mut self, name: impl Into<String>) -> Self {
        self.alternative_methods.push(name.into());
        self
    }

    pub fn param(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            kind,
            required,
            description: description.into(),
        });
        self
    }

    pub fn build(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            capabilities: self.capabilities,
            requires_network: self.requires_network,
            requires_filesystem: self.requires_filesystem,
            alternative_methods: self.alternative_methods,
            parameters: self.parameters,
        }
    }
}
