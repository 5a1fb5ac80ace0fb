use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use serde_json::Map;

use crate::domain::config::CpiConfig;
use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::node::filter::Filter;
use crate::domain::node::node::Node;
use crate::domain::node::tags::RESERVED_TAG;
use crate::domain::reservation::node_selector::select_node;
use crate::domain::reservation::reservation_coordinator::{ReservationSteps, try_reserve};
use crate::domain::utils::id::{DiskCid, NodeId};
use crate::domain::workflow::template_repository::TemplateRepository;
use crate::domain::workflow::workflow_builder::{WorkflowKind, build_bundle, with_obm_settings};
use crate::domain::workflow::workflow_runner::{RunnerSettings, publish_and_run};
use crate::error::{Error, Result};

/// Reservation steps backed by the fleet manager: claim by tag, then run the reserve workflow.
pub struct FleetReservation<'a> {
    pub api: &'a dyn FleetApi,
    pub templates: &'a dyn TemplateRepository,
    pub config: &'a CpiConfig,
    pub rng: &'a Mutex<StdRng>,
}

impl FleetReservation<'_> {
    pub async fn reserve_node(&self, hint: Option<&DiskCid>, filter: &Filter) -> Result<NodeId> {
        try_reserve(self, hint, filter, self.config.max_reserve_node_attempts).await
    }
}

#[async_trait]
impl ReservationSteps for FleetReservation<'_> {
    async fn select(&self, hint: Option<&DiskCid>, filter: &Filter) -> Result<Node> {
        select_node(self.api, hint, filter, self.rng).await
    }

    async fn reserve(&self, node: &Node) -> Result<()> {
        self.api.add_tags(&node.id, &[RESERVED_TAG.to_string()]).await?;

        let mut bundle = build_bundle(self.templates, WorkflowKind::ReserveNode, &self.config.request_id)?;
        if !node.has_obm_settings() {
            let defaults = self.config.obm_defaults.as_ref().ok_or_else(|| {
                Error::ValidationError(format!("node {} has no OBM settings and no OBM defaults are configured", node.id))
            })?;
            bundle.graph = with_obm_settings(bundle.graph, defaults)?;
        }

        publish_and_run(self.api, &bundle, &node.id, Map::new(), RunnerSettings::from(self.config)).await
    }

    async fn rollback(&self, node: &Node) -> Result<()> {
        // A node that was already reserved when selected belongs to an earlier invocation.
        if node.is_reserved() {
            return Ok(());
        }

        log::info!("Releasing reservation of node {}.", node.id);
        self.api.delete_tag(&node.id, RESERVED_TAG).await
    }
}
