use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use orch_core::{ToolDescriptor, MISSING_TOOL};

use crate::tool::Tool;
use crate::RegistryError;

/// Maps lowercased tool name to instance, plus a secondary index from
/// capability tag to the set of tool names that advertise it. Populated
/// once at startup; read-only and freely shared afterward.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    by_capability: HashMap<String, HashSet<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.descriptor().name.to_ascii_lowercase();
        if name == MISSING_TOOL.to_ascii_lowercase() {
            return Err(RegistryError::ReservedName(tool.descriptor().name.clone()));
        }
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(tool.descriptor().name.clone()));
        }
        for tag in &tool.descriptor().capabilities {
            self.by_capability
                .entry(tag.clone())
                .or_default()
                .insert(name.clone());
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(&name.to_ascii_lowercase())
    }

    pub fn by_capability(&self, tag: &str) -> Vec<&Arc<dyn Tool>> {
        self.by_capability
            .get(tag)
            .into_iter()
            .flatten()
            .filter_map(|name| self.tools.get(name))
            .collect()
    }

    pub fn capabilities(&self) -> Vec<&str> {
        self.by_capability.keys().map(String::as_str).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    /// Renders a stable, human-readable catalogue of every registered tool,
    /// meant to be injected verbatim into the LLM's system prompt.
    pub fn catalogue(&self) -> String {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();

        let mut out = String::new();
        for name in names {
            let tool = &self.tools[name];
            let d = tool.descriptor();
            let _ = writeln!(out, "## {}", d.name);
            let _ = writeln!(out, "{}", d.description);
            let _ = writeln!(out, "- capabilities: {}", d.capabilities.join(", "));
            let _ = writeln!(
                out,
                "- requires network: {} / requires filesystem: {}",
                d.requires_network, d.requires_filesystem
            );
            if !d.alternative_methods.is_empty() {
                let _ = writeln!(out, "- fallback methods: {}", d.alternative_methods.join(", "));
            }
            if d.parameters.is_empty() {
                let _ = writeln!(out, "- parameters: none");
            } else {
                let _ = writeln!(out, "- parameters:");
                for p in &d.parameters {
                    let _ = writeln!(
                        out,
                        "  - `{}` ({}{}): {}",
                        p.name,
                        p.kind,
                        if p.required { ", required" } else { ", optional" },
                        p.description
                    );
                }
            }
            out.push('\n');
        }
        out
    }

    /// Tool names whose Levenshtein distance to `name` is smallest, for the
    /// "unknown tool" error message's "closest matches" hint.
    pub fn closest_names(&self, name: &str, limit: usize) -> Vec<String> {
        let mut scored: Vec<(usize, &String)> = self
            .tools
            .keys()
            .map(|candidate| (levenshtein(&name.to_ascii_lowercase(), candidate), candidate))
            .collect();
        scored.sort_by_key(|(dist, _)| *dist);
        scored.into_iter().take(limit).map(|(_, n)| n.clone()).collect()
    }
}

/// Classic Wagner-Fischer dynamic-programming edit distance. Small and
/// self-contained rather than a dependency, since the registry only ever
/// compares short tool names.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (la, lb) = (a.len(), b.len());
    let mut row: Vec<usize> = (0..=lb).collect();
    for i in 1..=la {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=lb {
            let tmp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev
            } else {
                1 + prev.min(row[j]).min(row[j - 1])
            };
            prev = tmp;
        }
    }
    row[lb]
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_core::{ParamKind, ToolContext, ToolResult};
    use std::sync::Arc;

    struct Stub(ToolDescriptor);

    impl Tool for Stub {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.0
        }

        fn execute(&self, _ctx: &mut ToolContext) -> ToolResult {
            ToolResult::ok("stub", "primary", 0)
        }
    }

    fn stub(name: &str, caps: &[&str]) -> Arc<dyn Tool> {
        Arc::new(Stub(ToolDescriptor {
            name: name.to_string(),
            description: "stub tool".into(),
            capabilities: caps.iter().map(|s| s.to_string()).collect(),
            requires_network: false,
            requires_filesystem: false,
            alternative_methods: vec![],
            parameters: vec![],
        }))
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut r = ToolRegistry::new();
        r.register(stub("FileReader", &["file:read"])).unwrap();
        assert!(r.lookup("filereader").is_some());
        assert!(r.lookup("FILEREADER").is_some());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut r = ToolRegistry::new();
        r.register(stub("FileReader", &["file:read"])).unwrap();
        let err = r.register(stub("filereader", &["file:read"])).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(_)));
    }

    #[test]
    fn missing_tool_sentinel_cannot_be_registered() {
        let mut r = ToolRegistry::new();
        let err = r.register(stub("MISSING_TOOL", &[])).unwrap_err();
        assert!(matches!(err, RegistryError::ReservedName(_)));
    }

    #[test]
    fn by_capability_returns_every_matching_tool() {
        let mut r = ToolRegistry::new();
        r.register(stub("FileReader", &["file:read"])).unwrap();
        r.register(stub("FileAnalyzer", &["file:read", "file:analyze"]))
            .unwrap();
        r.register(stub("RepoDownload", &["repo:download"])).unwrap();
        let readers = r.by_capability("file:read");
        assert_eq!(readers.len(), 2);
    }

    #[test]
    fn registry_closure_every_catalogued_capability_resolves() {
        let mut r = ToolRegistry::new();
        r.register(stub("FileReader", &["file:read"])).unwrap();
        r.register(stub("DirList", &["fs:ls"])).unwrap();
        for cap in r.capabilities() {
            let tools = r.by_capability(cap);
            assert!(!tools.is_empty());
            for t in tools {
                assert!(t.descriptor().has_capability(cap));
            }
        }
    }

    #[test]
    fn catalogue_lists_every_tool_and_is_stable() {
        let mut r = ToolRegistry::new();
        r.register(stub("Zeta", &["z:tag"])).unwrap();
        r.register(stub("Alpha", &["a:tag"])).unwrap();
        let first = r.catalogue();
        let second = r.catalogue();
        assert_eq!(first, second);
        assert!(first.find("## Alpha").unwrap() < first.find("## Zeta").unwrap());
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn closest_names_orders_by_distance() {
        let mut r = ToolRegistry::new();
        r.register(stub("filereader", &[])).unwrap();
        r.register(stub("filewriter", &[])).unwrap();
        r.register(stub("repodownload", &[])).unwrap();
        let closest = r.closest_names("filereder", 2);
        assert_eq!(closest[0], "filereader");
    }

    #[test]
    fn unused_param_kind_variants_display() {
        assert_eq!(format!("{}", ParamKind::Integer), "integer");
        assert_eq!(format!("{}", ParamKind::Float), "float");
        assert_eq!(format!("{}", ParamKind::Bool), "bool");
    }
}
