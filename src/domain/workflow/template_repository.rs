use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::loader::parser::parse_json_str;

pub const RESERVE_NODE_TASK: &str = "reserve_node_task";
pub const RESERVE_NODE_GRAPH: &str = "reserve_node_graph";
pub const PROVISION_NODE_TASK: &str = "provision_node_task";
pub const PROVISION_NODE_GRAPH: &str = "provision_node_graph";
pub const DEPROVISION_NODE_TASK: &str = "deprovision_node_task";
pub const DEPROVISION_NODE_GRAPH: &str = "deprovision_node_graph";

/// Source of task and graph templates, looked up by name.
pub trait TemplateRepository: Send + Sync {
    fn load(&self, name: &str) -> Result<Value>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone)]
pub struct EmbeddedTemplates {
    templates: HashMap<&'static str, &'static str>,
}

impl EmbeddedTemplates {
    pub fn new() -> Self {
        let templates = HashMap::from([
            (RESERVE_NODE_TASK, include_str!("templates/reserve_node_task.json")),
            (RESERVE_NODE_GRAPH, include_str!("templates/reserve_node_graph.json")),
            (PROVISION_NODE_TASK, include_str!("templates/provision_node_task.json")),
            (PROVISION_NODE_GRAPH, include_str!("templates/provision_node_graph.json")),
            (DEPROVISION_NODE_TASK, include_str!("templates/deprovision_node_task.json")),
            (DEPROVISION_NODE_GRAPH, include_str!("templates/deprovision_node_graph.json")),
        ]);

        EmbeddedTemplates { templates }
    }
}

impl Default for EmbeddedTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRepository for EmbeddedTemplates {
    fn load(&self, name: &str) -> Result<Value> {
        let raw = self.templates.get(name).ok_or_else(|| Error::NotFoundError(format!("template {} not found", name)))?;

        parse_json_str(raw)
    }
}

/// Templates held in memory, for callers that supply their own.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplates {
    templates: HashMap<String, Value>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, template: Value) -> Self {
        self.templates.insert(name.to_string(), template);
        self
    }
}

impl TemplateRepository for InMemoryTemplates {
    fn load(&self, name: &str) -> Result<Value> {
        self.templates.get(name).cloned().ok_or_else(|| Error::NotFoundError(format!("template {} not found", name)))
    }
}
