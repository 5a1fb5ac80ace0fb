use async_trait::async_trait;
use serde_json::Value;

use crate::api::fleet_dto::{NodeCatalogDto, NodeDto, PersistentDiskSettings, WorkflowInstanceDto};
use crate::domain::utils::id::{NodeId, WorkflowInstanceId};
use crate::error::Result;

/// The remote fleet-management API.
///
/// Every piece of shared state the CPI touches (tags, disk bookkeeping,
/// workflows, files) goes through this trait; nothing is kept locally
/// between invocations.
#[async_trait]
pub trait FleetApi: Send + Sync {
    // GET /nodes
    async fn get_nodes(&self) -> Result<Vec<NodeDto>>;

    // GET /nodes/{id}
    async fn get_node(&self, node_id: &NodeId) -> Result<NodeDto>;

    // GET /nodes/{id}/catalogs/ohai
    async fn get_node_catalog(&self, node_id: &NodeId) -> Result<NodeCatalogDto>;

    // PATCH /nodes/{id}
    async fn patch_persistent_disk(&self, node_id: &NodeId, settings: &PersistentDiskSettings) -> Result<()>;

    // PATCH /nodes/{id}/tags
    async fn add_tags(&self, node_id: &NodeId, tags: &[String]) -> Result<()>;

    // DELETE /nodes/{id}/tags/{tag}
    async fn delete_tag(&self, node_id: &NodeId, tag: &str) -> Result<()>;

    // GET /tags/{tag}/nodes
    async fn get_nodes_by_tag(&self, tag: &str) -> Result<Vec<NodeDto>>;

    // PUT /workflows/tasks
    async fn put_task(&self, task: &Value) -> Result<()>;

    // GET /workflows/tasks/{name}
    async fn get_task(&self, name: &str) -> Result<Value>;

    // PUT /workflows/graphs
    async fn put_graph(&self, graph: &Value) -> Result<()>;

    // GET /workflows/graphs/{name}
    async fn get_graph(&self, name: &str) -> Result<Value>;

    // POST /nodes/{id}/workflows
    async fn post_workflow(&self, node_id: &NodeId, body: &Value) -> Result<WorkflowInstanceDto>;

    // GET /workflows/{instanceId}
    async fn get_workflow(&self, instance_id: &WorkflowInstanceId) -> Result<WorkflowInstanceDto>;

    // GET /nodes/{id}/workflows?active=true
    async fn get_active_workflows(&self, node_id: &NodeId) -> Result<Vec<WorkflowInstanceDto>>;

    // PUT /nodes/{id}/workflows/action
    async fn cancel_active_workflow(&self, node_id: &NodeId) -> Result<()>;

    /// PUT /files/{name}, returns the uuid the file is stored under.
    async fn upload_file(&self, name: &str, contents: Vec<u8>) -> Result<String>;

    // DELETE /files/{name}
    async fn delete_file(&self, name: &str) -> Result<()>;
}
