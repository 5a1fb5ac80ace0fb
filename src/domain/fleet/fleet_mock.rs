use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::api::fleet_dto::{NodeCatalogDto, NodeDto, PersistentDiskSettings, WorkflowInstanceDto};
use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::utils::id::{NodeId, WorkflowInstanceId};
use crate::error::{Error, Result};

/// A recorded mutation or workflow call against the [`MockFleet`].
#[derive(Debug, Clone, PartialEq)]
pub enum FleetCall {
    PatchPersistentDisk(String, PersistentDiskSettings),
    AddTags(String, Vec<String>),
    DeleteTag(String, String),
    PutTask(String),
    PutGraph(String),
    PostWorkflow(String, String),
    CancelActiveWorkflow(String),
    UploadFile(String),
    DeleteFile(String),
}

#[derive(Debug, Default)]
struct MockFleetState {
    nodes: BTreeMap<String, NodeDto>,
    catalogs: HashMap<String, NodeCatalogDto>,
    active_workflows: HashMap<String, Vec<WorkflowInstanceDto>>,
    tasks: BTreeMap<String, Value>,
    graphs: BTreeMap<String, Value>,
    files: BTreeMap<String, Vec<u8>>,
    /// Status sequences handed out to posted workflows whose name contains the key.
    workflow_scripts: Vec<(String, VecDeque<Vec<String>>)>,
    instances: HashMap<String, VecDeque<String>>,
    failing: HashSet<&'static str>,
    calls: Vec<FleetCall>,
    next_id: u64,
}

/// In-memory stand-in for the remote fleet manager.
///
/// Workflows succeed on first poll unless a status script says otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockFleet {
    state: Arc<Mutex<MockFleetState>>,
}

impl MockFleet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockFleetState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn guard(&self, operation: &'static str) -> Result<MutexGuard<'_, MockFleetState>> {
        let state = self.lock();
        if state.failing.contains(operation) {
            return Err(Error::ApiError { method: "MOCK".to_string(), url: operation.to_string(), status: 500, body: "injected failure".to_string() });
        }
        Ok(state)
    }

    pub fn add_node(&self, node: NodeDto) {
        self.lock().nodes.insert(node.id.clone(), node);
    }

    pub fn add_catalog(&self, node_id: &str, catalog: NodeCatalogDto) {
        self.lock().catalogs.insert(node_id.to_string(), catalog);
    }

    pub fn set_active_workflow(&self, node_id: &str, name: &str) {
        let instance = WorkflowInstanceDto { instance_id: format!("active-{}", node_id), injectable_name: name.to_string(), status: "running".to_string(), pending_tasks: Vec::new() };
        self.lock().active_workflows.entry(node_id.to_string()).or_default().push(instance);
    }

    /// The next workflow posted with `name_fragment` in its name reports `statuses` in order.
    /// The last status repeats once the sequence is exhausted.
    pub fn script_workflow(&self, name_fragment: &str, statuses: &[&str]) {
        let statuses = statuses.iter().map(|s| s.to_string()).collect();
        let mut state = self.lock();
        match state.workflow_scripts.iter_mut().find(|(fragment, _)| fragment == name_fragment) {
            Some((_, scripts)) => scripts.push_back(statuses),
            None => state.workflow_scripts.push((name_fragment.to_string(), VecDeque::from([statuses]))),
        }
    }

    pub fn fail_operation(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    pub fn node(&self, node_id: &str) -> Option<NodeDto> {
        self.lock().nodes.get(node_id).cloned()
    }

    pub fn tags(&self, node_id: &str) -> Vec<String> {
        self.node(node_id).map(|node| node.tags).unwrap_or_default()
    }

    pub fn task(&self, name: &str) -> Option<Value> {
        self.lock().tasks.get(name).cloned()
    }

    pub fn graph(&self, name: &str) -> Option<Value> {
        self.lock().graphs.get(name).cloned()
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().files.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<FleetCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&FleetCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn missing_node(node_id: &NodeId) -> Error {
        Error::ApiError { method: "GET".to_string(), url: format!("/nodes/{}", node_id), status: 404, body: "not found".to_string() }
    }
}

#[async_trait]
impl FleetApi for MockFleet {
    async fn get_nodes(&self) -> Result<Vec<NodeDto>> {
        Ok(self.guard("get_nodes")?.nodes.values().cloned().collect())
    }

    async fn get_node(&self, node_id: &NodeId) -> Result<NodeDto> {
        self.guard("get_node")?.nodes.get(node_id.as_str()).cloned().ok_or_else(|| Self::missing_node(node_id))
    }

    async fn get_node_catalog(&self, node_id: &NodeId) -> Result<NodeCatalogDto> {
        self.guard("get_node_catalog")?.catalogs.get(node_id.as_str()).cloned().ok_or_else(|| Self::missing_node(node_id))
    }

    async fn patch_persistent_disk(&self, node_id: &NodeId, settings: &PersistentDiskSettings) -> Result<()> {
        let mut state = self.guard("patch_persistent_disk")?;
        let node = state.nodes.get_mut(node_id.as_str()).ok_or_else(|| Self::missing_node(node_id))?;
        node.persistent_disk = settings.clone();
        state.calls.push(FleetCall::PatchPersistentDisk(node_id.to_string(), settings.clone()));
        Ok(())
    }

    async fn add_tags(&self, node_id: &NodeId, tags: &[String]) -> Result<()> {
        let mut state = self.guard("add_tags")?;
        let node = state.nodes.get_mut(node_id.as_str()).ok_or_else(|| Self::missing_node(node_id))?;
        for tag in tags {
            if !node.tags.contains(tag) {
                node.tags.push(tag.clone());
            }
        }
        state.calls.push(FleetCall::AddTags(node_id.to_string(), tags.to_vec()));
        Ok(())
    }

    async fn delete_tag(&self, node_id: &NodeId, tag: &str) -> Result<()> {
        let mut state = self.guard("delete_tag")?;
        let node = state.nodes.get_mut(node_id.as_str()).ok_or_else(|| Self::missing_node(node_id))?;
        node.tags.retain(|t| t != tag);
        state.calls.push(FleetCall::DeleteTag(node_id.to_string(), tag.to_string()));
        Ok(())
    }

    async fn get_nodes_by_tag(&self, tag: &str) -> Result<Vec<NodeDto>> {
        Ok(self.guard("get_nodes_by_tag")?.nodes.values().filter(|node| node.tags.iter().any(|t| t == tag)).cloned().collect())
    }

    async fn put_task(&self, task: &Value) -> Result<()> {
        let mut state = self.guard("put_task")?;
        let name = task["injectableName"].as_str().unwrap_or_default().to_string();
        state.tasks.insert(name.clone(), task.clone());
        state.calls.push(FleetCall::PutTask(name));
        Ok(())
    }

    async fn get_task(&self, name: &str) -> Result<Value> {
        self.guard("get_task")?.tasks.get(name).cloned().ok_or_else(|| Error::ApiError {
            method: "GET".to_string(),
            url: format!("/workflows/tasks/{}", name),
            status: 404,
            body: "not found".to_string(),
        })
    }

    async fn put_graph(&self, graph: &Value) -> Result<()> {
        let mut state = self.guard("put_graph")?;
        let name = graph["injectableName"].as_str().unwrap_or_default().to_string();
        state.graphs.insert(name.clone(), graph.clone());
        state.calls.push(FleetCall::PutGraph(name));
        Ok(())
    }

    async fn get_graph(&self, name: &str) -> Result<Value> {
        self.guard("get_graph")?.graphs.get(name).cloned().ok_or_else(|| Error::ApiError {
            method: "GET".to_string(),
            url: format!("/workflows/graphs/{}", name),
            status: 404,
            body: "not found".to_string(),
        })
    }

    async fn post_workflow(&self, node_id: &NodeId, body: &Value) -> Result<WorkflowInstanceDto> {
        let mut state = self.guard("post_workflow")?;
        let name = body["name"].as_str().unwrap_or_default().to_string();
        state.next_id += 1;
        let instance_id = format!("workflow-{}", state.next_id);

        let statuses = state
            .workflow_scripts
            .iter_mut()
            .find(|(fragment, scripts)| name.contains(fragment.as_str()) && !scripts.is_empty())
            .and_then(|(_, scripts)| scripts.pop_front())
            .unwrap_or_else(|| vec!["succeeded".to_string()]);

        state.instances.insert(instance_id.clone(), VecDeque::from(statuses));
        state.calls.push(FleetCall::PostWorkflow(node_id.to_string(), name.clone()));

        Ok(WorkflowInstanceDto { instance_id, injectable_name: name, status: "pending".to_string(), pending_tasks: Vec::new() })
    }

    async fn get_workflow(&self, instance_id: &WorkflowInstanceId) -> Result<WorkflowInstanceDto> {
        let mut state = self.guard("get_workflow")?;
        let statuses = state.instances.get_mut(instance_id.as_str()).ok_or_else(|| Error::ApiError {
            method: "GET".to_string(),
            url: format!("/workflows/{}", instance_id),
            status: 404,
            body: "not found".to_string(),
        })?;

        let status = if statuses.len() > 1 { statuses.pop_front().unwrap_or_default() } else { statuses.front().cloned().unwrap_or_default() };

        Ok(WorkflowInstanceDto { instance_id: instance_id.to_string(), injectable_name: String::new(), status, pending_tasks: Vec::new() })
    }

    async fn get_active_workflows(&self, node_id: &NodeId) -> Result<Vec<WorkflowInstanceDto>> {
        Ok(self.guard("get_active_workflows")?.active_workflows.get(node_id.as_str()).cloned().unwrap_or_default())
    }

    async fn cancel_active_workflow(&self, node_id: &NodeId) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(FleetCall::CancelActiveWorkflow(node_id.to_string()));
        if state.failing.contains("cancel_active_workflow") {
            return Err(Error::ApiError { method: "PUT".to_string(), url: format!("/nodes/{}/workflows/action", node_id), status: 500, body: "injected failure".to_string() });
        }
        state.active_workflows.remove(node_id.as_str());
        Ok(())
    }

    async fn upload_file(&self, name: &str, contents: Vec<u8>) -> Result<String> {
        let mut state = self.guard("upload_file")?;
        state.next_id += 1;
        let uuid = format!("file-uuid-{}", state.next_id);
        state.files.insert(uuid.clone(), contents);
        state.calls.push(FleetCall::UploadFile(name.to_string()));
        Ok(uuid)
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let mut state = self.guard("delete_file")?;
        state.files.remove(name);
        state.calls.push(FleetCall::DeleteFile(name.to_string()));
        Ok(())
    }
}
