use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::config::CpiConfig;
use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::utils::id::{NodeId, WorkflowInstanceId};
use crate::domain::workflow::workflow_builder::{WorkflowBundle, build_run_request};
use crate::domain::workflow::workflow_publisher::publish_bundle;
use crate::domain::workflow::workflow_status::WorkflowStatus;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl RunnerSettings {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        RunnerSettings { timeout, poll_interval }
    }
}

impl From<&CpiConfig> for RunnerSettings {
    fn from(config: &CpiConfig) -> Self {
        RunnerSettings::new(config.run_workflow_timeout, config.workflow_poll_interval)
    }
}

/// Starts the workflow described by `request` on `node_id` and polls it until it reaches a terminal state.
///
/// A workflow still running at the deadline is cancelled on the node.
pub async fn run_workflow(api: &dyn FleetApi, node_id: &NodeId, request: &Value, settings: RunnerSettings) -> Result<()> {
    let workflow = request["name"].as_str().unwrap_or_default().to_string();

    let instance = api.post_workflow(node_id, request).await?;
    let instance_id = WorkflowInstanceId::new(instance.instance_id);

    tracing::info!(target: "cpi::workflow", node_id = %node_id, workflow = %workflow, instance_id = %instance_id, "Workflow started");

    let deadline = tokio::time::sleep_until(Instant::now() + settings.timeout);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                return Err(abort_timed_out(api, node_id, &workflow, settings.timeout).await);
            }

            _ = ticker.tick() => {
                let raw_status = api.get_workflow(&instance_id).await?.status;

                let status = raw_status.parse::<WorkflowStatus>().map_err(|status| {
                    log::error!("WorkflowStatusUnrecognized: Workflow {} on node {} reported status '{}'.", workflow, node_id, status);
                    Error::UnrecognizedWorkflowStatus { workflow: workflow.clone(), node_id: node_id.to_string(), status }
                })?;

                match status {
                    WorkflowStatus::Pending | WorkflowStatus::Running => {
                        log::debug!("Workflow {} on node {} is {}.", workflow, node_id, status);
                    }
                    WorkflowStatus::Succeeded => {
                        tracing::info!(target: "cpi::workflow", node_id = %node_id, workflow = %workflow, "Workflow succeeded");
                        return Ok(());
                    }
                    WorkflowStatus::Cancelled => {
                        log::warn!("Workflow {} on node {} was cancelled.", workflow, node_id);
                        return Ok(());
                    }
                    WorkflowStatus::Failed => {
                        log::error!("WorkflowFailed: Workflow {} on node {} failed.", workflow, node_id);
                        return Err(Error::WorkflowFailed { workflow, node_id: node_id.to_string() });
                    }
                }
            }
        }
    }
}

/// Publishes `bundle` and runs its graph on `node_id` with `options` as graph defaults.
pub async fn publish_and_run(api: &dyn FleetApi, bundle: &WorkflowBundle, node_id: &NodeId, options: Map<String, Value>, settings: RunnerSettings) -> Result<()> {
    let graph_name = publish_bundle(api, bundle).await?;
    let request = build_run_request(&graph_name, options);

    run_workflow(api, node_id, &request, settings).await
}

async fn abort_timed_out(api: &dyn FleetApi, node_id: &NodeId, workflow: &str, timeout: Duration) -> Error {
    log::warn!("Workflow {} on node {} did not finish within {}s, cancelling.", workflow, node_id, timeout.as_secs());

    match api.cancel_active_workflow(node_id).await {
        Ok(()) => Error::WorkflowTimeout { workflow: workflow.to_string(), node_id: node_id.to_string(), timeout_s: timeout.as_secs() },
        Err(cause) => {
            log::error!("WorkflowAbortFailed: Could not cancel workflow {} on node {}: {}", workflow, node_id, cause);
            Error::WorkflowAbortError { workflow: workflow.to_string(), node_id: node_id.to_string(), cause: Box::new(cause) }
        }
    }
}
