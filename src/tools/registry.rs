use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{
    CheckPortTool, CreateOutlineTool, CurrentTimeTool, EditDocumentTool, ExecuteBashTool,
    ReadFileTool, Tool, ToolDescriptor, ToolOutput, ToolsConfig, WriteFileTool,
};
use crate::error::{Result, ToolError};

/// Tools available for dispatch, keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the builtin tools.
    pub fn with_builtins(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ExecuteBashTool::new(
            config.executor.clone(),
            Arc::clone(&config.validator),
            config.default_timeout_secs,
        )));
        registry.register(Arc::new(CheckPortTool::new(config.probe_timeout)));
        registry.register(Arc::new(ReadFileTool::new(Arc::clone(&config.validator))));
        registry.register(Arc::new(WriteFileTool::new(Arc::clone(&config.validator))));
        registry.register(Arc::new(CreateOutlineTool::new(Arc::clone(&config.validator))));
        registry.register(Arc::new(EditDocumentTool::new(Arc::clone(&config.validator))));
        registry.register(Arc::new(CurrentTimeTool));
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call by tool name.
    pub async fn call(&self, name: &str, input: Value) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        debug!(tool = name, "calling tool");
        tool.call(input).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
