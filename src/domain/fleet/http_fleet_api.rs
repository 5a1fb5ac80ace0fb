use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::fleet_dto::{
    NodeCatalogDto, NodeDto, PersistentDiskPatchDto, PersistentDiskSettings, TagsPatchDto, WorkflowActionDto, WorkflowInstanceDto,
};
use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::fleet::fleet_endpoint::FleetEndpoint;
use crate::domain::utils::id::{NodeId, WorkflowInstanceId};
use crate::error::{Error, Result};

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// [`FleetApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpFleetApi {
    api_url: String,
    client: reqwest::Client,
}

impl HttpFleetApi {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).timeout(HTTP_TIMEOUT).build()?;

        Ok(HttpFleetApi { api_url: api_url.trim_end_matches('/').to_string(), client })
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, endpoint: FleetEndpoint<'_>, body: Option<&B>) -> Result<Response> {
        let url = endpoint.url(&self.api_url);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        log::debug!("{} {}", method, url);
        let response = request.send().await?;

        Self::check(method, url, response).await
    }

    async fn check(method: Method, url: String, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::error!("FleetApiRequestFailed: {} {} returned status {}. Response-Body: <<{}>>", method, url, status, body);

        Err(Error::ApiError { method: method.to_string(), url, status: status.as_u16(), body })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: FleetEndpoint<'_>) -> Result<T> {
        let response = self.send::<Value>(Method::GET, endpoint, None).await?;
        let text = response.text().await?;

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn get_nodes(&self) -> Result<Vec<NodeDto>> {
        self.get_json(FleetEndpoint::Nodes).await
    }

    async fn get_node(&self, node_id: &NodeId) -> Result<NodeDto> {
        self.get_json(FleetEndpoint::Node(node_id.as_str())).await
    }

    async fn get_node_catalog(&self, node_id: &NodeId) -> Result<NodeCatalogDto> {
        self.get_json(FleetEndpoint::NodeCatalog(node_id.as_str())).await
    }

    async fn patch_persistent_disk(&self, node_id: &NodeId, settings: &PersistentDiskSettings) -> Result<()> {
        let body = PersistentDiskPatchDto { persistent_disk: settings };
        self.send(Method::PATCH, FleetEndpoint::Node(node_id.as_str()), Some(&body)).await?;
        Ok(())
    }

    async fn add_tags(&self, node_id: &NodeId, tags: &[String]) -> Result<()> {
        let body = TagsPatchDto { tags };
        self.send(Method::PATCH, FleetEndpoint::NodeTags(node_id.as_str()), Some(&body)).await?;
        Ok(())
    }

    async fn delete_tag(&self, node_id: &NodeId, tag: &str) -> Result<()> {
        self.send::<Value>(Method::DELETE, FleetEndpoint::NodeTag(node_id.as_str(), tag), None).await?;
        Ok(())
    }

    async fn get_nodes_by_tag(&self, tag: &str) -> Result<Vec<NodeDto>> {
        self.get_json(FleetEndpoint::NodesByTag(tag)).await
    }

    async fn put_task(&self, task: &Value) -> Result<()> {
        self.send(Method::PUT, FleetEndpoint::Tasks, Some(task)).await?;
        Ok(())
    }

    async fn get_task(&self, name: &str) -> Result<Value> {
        self.get_json(FleetEndpoint::Task(name)).await
    }

    async fn put_graph(&self, graph: &Value) -> Result<()> {
        self.send(Method::PUT, FleetEndpoint::Graphs, Some(graph)).await?;
        Ok(())
    }

    async fn get_graph(&self, name: &str) -> Result<Value> {
        self.get_json(FleetEndpoint::Graph(name)).await
    }

    async fn post_workflow(&self, node_id: &NodeId, body: &Value) -> Result<WorkflowInstanceDto> {
        let response = self.send(Method::POST, FleetEndpoint::NodeWorkflows(node_id.as_str()), Some(body)).await?;
        let text = response.text().await?;

        Ok(serde_json::from_str(&text)?)
    }

    async fn get_workflow(&self, instance_id: &WorkflowInstanceId) -> Result<WorkflowInstanceDto> {
        self.get_json(FleetEndpoint::Workflow(instance_id.as_str())).await
    }

    async fn get_active_workflows(&self, node_id: &NodeId) -> Result<Vec<WorkflowInstanceDto>> {
        let endpoint = FleetEndpoint::NodeActiveWorkflows(node_id.as_str());
        let url = endpoint.url(&self.api_url);
        let response = self.client.get(&url).send().await?;

        // Older API versions answer "no active workflow" with 404 or 204.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::NO_CONTENT) {
            return Ok(Vec::new());
        }

        let text = Self::check(Method::GET, url, response).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&text)? {
            Value::Array(items) => Ok(items.into_iter().map(serde_json::from_value).collect::<std::result::Result<Vec<WorkflowInstanceDto>, _>>()?),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![serde_json::from_value(single)?]),
        }
    }

    async fn cancel_active_workflow(&self, node_id: &NodeId) -> Result<()> {
        let body = WorkflowActionDto { command: "cancel".to_string() };
        self.send(Method::PUT, FleetEndpoint::NodeWorkflowAction(node_id.as_str()), Some(&body)).await?;
        Ok(())
    }

    async fn upload_file(&self, name: &str, contents: Vec<u8>) -> Result<String> {
        let url = FleetEndpoint::File(name).url(&self.api_url);
        let response = self.client.put(&url).header(reqwest::header::CONTENT_TYPE, "application/octet-stream").body(contents).send().await?;

        let uuid = Self::check(Method::PUT, url, response).await?.text().await?;

        Ok(uuid.trim().trim_matches('"').to_string())
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        self.send::<Value>(Method::DELETE, FleetEndpoint::File(name), None).await?;
        Ok(())
    }
}
