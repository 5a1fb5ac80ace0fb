use serde_json::Value;

use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::utils::id::RequestId;
use crate::domain::workflow::template_repository::TemplateRepository;
use crate::domain::workflow::workflow_builder::{WorkflowBundle, WorkflowKind, build_bundle};
use crate::error::{Error, Result};

/// True if every field of `uploaded` comes back unchanged in `fetched`.
///
/// The fleet manager may decorate stored documents with its own fields (ids, timestamps).
pub fn is_published_copy(uploaded: &Value, fetched: &Value) -> bool {
    match (uploaded, fetched) {
        (Value::Object(expected), Value::Object(actual)) => {
            expected.iter().all(|(key, value)| actual.get(key).is_some_and(|stored| is_published_copy(value, stored)))
        }
        _ => uploaded == fetched,
    }
}

fn name_of(document: &Value) -> Result<&str> {
    document["injectableName"].as_str().ok_or_else(|| Error::PublishError { name: String::new(), reason: "document has no injectableName".to_string() })
}

pub async fn publish_task(api: &dyn FleetApi, task: &Value) -> Result<String> {
    let name = name_of(task)?;

    api.put_task(task).await?;
    let fetched = api.get_task(name).await.map_err(|e| Error::PublishError { name: name.to_string(), reason: format!("re-fetching task failed: {}", e) })?;

    if !is_published_copy(task, &fetched) {
        return Err(Error::PublishError { name: name.to_string(), reason: "stored task does not match uploaded task".to_string() });
    }

    log::debug!("Published task {}.", name);
    Ok(name.to_string())
}

pub async fn publish_graph(api: &dyn FleetApi, graph: &Value) -> Result<String> {
    let name = name_of(graph)?;

    api.put_graph(graph).await?;
    let fetched = api.get_graph(name).await.map_err(|e| Error::PublishError { name: name.to_string(), reason: format!("re-fetching graph failed: {}", e) })?;

    if !is_published_copy(graph, &fetched) {
        return Err(Error::PublishError { name: name.to_string(), reason: "stored graph does not match uploaded graph".to_string() });
    }

    log::debug!("Published graph {}.", name);
    Ok(name.to_string())
}

/// Uploads tasks before the graph that references them; returns the graph name.
pub async fn publish_bundle(api: &dyn FleetApi, bundle: &WorkflowBundle) -> Result<String> {
    for task in &bundle.tasks {
        publish_task(api, task).await?;
    }

    publish_graph(api, &bundle.graph).await
}

pub async fn publish(api: &dyn FleetApi, templates: &dyn TemplateRepository, kind: WorkflowKind, request_id: &RequestId) -> Result<String> {
    let bundle = build_bundle(templates, kind, request_id)?;
    let graph_name = publish_bundle(api, &bundle).await?;

    log::info!("Published workflow {:?} as {}.", kind, graph_name);
    Ok(graph_name)
}
