use serde_json::{Map, Value, json};

use crate::domain::config::ObmDefaults;
use crate::domain::utils::id::RequestId;
use crate::domain::workflow::template_repository::{
    DEPROVISION_NODE_GRAPH, DEPROVISION_NODE_TASK, PROVISION_NODE_GRAPH, PROVISION_NODE_TASK, RESERVE_NODE_GRAPH, RESERVE_NODE_TASK,
    TemplateRepository,
};
use crate::error::{Error, Result};

pub const SET_OBM_SETTINGS_LABEL: &str = "set-obm-settings";
pub const SET_OBM_SETTINGS_TASK: &str = "Task.Obm.Ipmi.CreateSettings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    ReserveNode,
    ProvisionNode,
    DeprovisionNode,
}

impl WorkflowKind {
    pub fn graph_template(&self) -> &'static str {
        match self {
            Self::ReserveNode => RESERVE_NODE_GRAPH,
            Self::ProvisionNode => PROVISION_NODE_GRAPH,
            Self::DeprovisionNode => DEPROVISION_NODE_GRAPH,
        }
    }

    pub fn task_templates(&self) -> &'static [&'static str] {
        match self {
            Self::ReserveNode => &[RESERVE_NODE_TASK],
            Self::ProvisionNode => &[PROVISION_NODE_TASK],
            Self::DeprovisionNode => &[DEPROVISION_NODE_TASK],
        }
    }
}

/// A task and graph set ready to be uploaded under per-invocation names.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowBundle {
    pub tasks: Vec<Value>,
    pub graph: Value,
}

impl WorkflowBundle {
    pub fn graph_name(&self) -> &str {
        self.graph["injectableName"].as_str().unwrap_or_default()
    }
}

pub fn unique_name(base: &str, request_id: &RequestId) -> String {
    format!("{}.{}", base, request_id)
}

fn injectable_name(template: &Value) -> Result<String> {
    template["injectableName"]
        .as_str()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::ValidationError(format!("template has no injectableName: {}", template)))
}

/// Renames a task template so that it is unique to this invocation.
pub fn build_task(mut template: Value, request_id: &RequestId) -> Result<Value> {
    let base = injectable_name(&template)?;
    template["injectableName"] = Value::String(unique_name(&base, request_id));

    Ok(template)
}

/// Renames a graph template and points its references to `custom_tasks` at the renamed tasks.
pub fn build_graph(mut template: Value, request_id: &RequestId, custom_tasks: &[String]) -> Result<Value> {
    let base = injectable_name(&template)?;
    template["injectableName"] = Value::String(unique_name(&base, request_id));

    if let Some(tasks) = template["tasks"].as_array_mut() {
        for task in tasks {
            let renamed = match task["taskName"].as_str() {
                Some(task_name) if custom_tasks.iter().any(|custom| custom == task_name) => unique_name(task_name, request_id),
                _ => continue,
            };
            task["taskName"] = Value::String(renamed);
        }
    }

    Ok(template)
}

/// Loads and renames every template a workflow of `kind` needs.
pub fn build_bundle(templates: &dyn TemplateRepository, kind: WorkflowKind, request_id: &RequestId) -> Result<WorkflowBundle> {
    let mut tasks = Vec::new();
    let mut custom_tasks = Vec::new();

    for name in kind.task_templates() {
        let template = templates.load(name)?;
        custom_tasks.push(injectable_name(&template)?);
        tasks.push(build_task(template, request_id)?);
    }

    let graph = build_graph(templates.load(kind.graph_template())?, request_id, &custom_tasks)?;

    Ok(WorkflowBundle { tasks, graph })
}

/// Prepends a task that writes OBM settings to a node registered without any.
///
/// The graph's first task is made to wait on it.
pub fn with_obm_settings(mut graph: Value, defaults: &ObmDefaults) -> Result<Value> {
    let name = injectable_name(&graph)?;
    let tasks = graph["tasks"].as_array_mut().ok_or_else(|| Error::ValidationError(format!("graph {} has no tasks", name)))?;

    if let Some(first) = tasks.first_mut() {
        first["waitOn"] = json!({ SET_OBM_SETTINGS_LABEL: "succeeded" });
    }

    tasks.insert(
        0,
        json!({
            "label": SET_OBM_SETTINGS_LABEL,
            "taskName": SET_OBM_SETTINGS_TASK,
            "optionOverrides": {
                "service": defaults.service,
                "config": {
                    "user": defaults.user,
                    "password": defaults.password,
                },
            },
        }),
    );

    Ok(graph)
}

/// Body of `POST /nodes/{id}/workflows`.
pub fn build_run_request(graph_name: &str, options: Map<String, Value>) -> Value {
    json!({
        "name": graph_name,
        "options": {
            "defaults": Value::Object(options),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::template_repository::EmbeddedTemplates;

    #[test]
    fn task_names_get_request_id_suffix() {
        let task = build_task(json!({"injectableName": "Task.BOSH.Reserve.Node", "options": {}}), &RequestId::new("r1")).unwrap();
        assert_eq!(task["injectableName"], "Task.BOSH.Reserve.Node.r1");
    }

    #[test]
    fn graph_references_only_custom_tasks_by_new_name() {
        let graph = json!({
            "injectableName": "Graph.BOSH.ReserveNode",
            "tasks": [
                {"label": "reboot", "taskName": "Task.Obm.Node.Reboot"},
                {"label": "reserve-node", "taskName": "Task.BOSH.Reserve.Node"}
            ]
        });

        let built = build_graph(graph, &RequestId::new("r1"), &["Task.BOSH.Reserve.Node".to_string()]).unwrap();

        assert_eq!(built["injectableName"], "Graph.BOSH.ReserveNode.r1");
        assert_eq!(built["tasks"][0]["taskName"], "Task.Obm.Node.Reboot");
        assert_eq!(built["tasks"][1]["taskName"], "Task.BOSH.Reserve.Node.r1");
    }

    #[test]
    fn template_without_name_is_rejected() {
        assert!(build_task(json!({"options": {}}), &RequestId::new("r1")).is_err());
    }

    #[test]
    fn bundle_for_provisioning_links_graph_and_task() {
        let bundle = build_bundle(&EmbeddedTemplates::new(), WorkflowKind::ProvisionNode, &RequestId::new("abc")).unwrap();

        assert_eq!(bundle.graph_name(), "Graph.BOSH.ProvisionNode.abc");
        assert_eq!(bundle.tasks.len(), 1);
        assert_eq!(bundle.tasks[0]["injectableName"], "Task.BOSH.Provision.Node.abc");

        let references: Vec<&str> = bundle.graph["tasks"].as_array().unwrap().iter().filter_map(|t| t["taskName"].as_str()).collect();
        assert!(references.contains(&"Task.BOSH.Provision.Node.abc"));
    }

    #[test]
    fn obm_settings_task_runs_first() {
        let bundle = build_bundle(&EmbeddedTemplates::new(), WorkflowKind::ReserveNode, &RequestId::new("r1")).unwrap();
        let defaults = ObmDefaults { service: "ipmi-obm-service".to_string(), user: "admin".to_string(), password: "secret".to_string() };

        let graph = with_obm_settings(bundle.graph, &defaults).unwrap();
        let tasks = graph["tasks"].as_array().unwrap();

        assert_eq!(tasks[0]["taskName"], SET_OBM_SETTINGS_TASK);
        assert_eq!(tasks[0]["optionOverrides"]["config"]["user"], "admin");
        assert_eq!(tasks[1]["waitOn"][SET_OBM_SETTINGS_LABEL], "succeeded");
    }

    #[test]
    fn run_request_wraps_options_in_defaults() {
        let mut options = Map::new();
        options.insert("stemcellFile".to_string(), json!("sc-1"));

        assert_eq!(build_run_request("Graph.X.r1", options), json!({"name": "Graph.X.r1", "options": {"defaults": {"stemcellFile": "sc-1"}}}));
    }
}
