use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Map, Value};

use crate::domain::config::CpiConfig;
use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::fleet::http_fleet_api::HttpFleetApi;
use crate::domain::node::filter::Filter;
use crate::domain::node::node::Node;
use crate::domain::reservation::fleet_reservation::FleetReservation;
use crate::domain::reservation::node_selector::find_node_by_tag;
use crate::domain::utils::id::{DiskCid, NodeId, RequestId};
use crate::domain::workflow::template_repository::{EmbeddedTemplates, TemplateRepository};
use crate::domain::workflow::workflow_builder::{WorkflowKind, build_bundle};
use crate::domain::workflow::workflow_runner::{RunnerSettings, publish_and_run};
use crate::error::{Error, Result};

/// Everything one CPI invocation works with.
pub struct CpiContext {
    api: Arc<dyn FleetApi>,
    templates: Arc<dyn TemplateRepository>,
    config: CpiConfig,
    rng: Mutex<StdRng>,
}

impl CpiContext {
    pub fn new(api: Arc<dyn FleetApi>, templates: Arc<dyn TemplateRepository>, config: CpiConfig, rng: StdRng) -> Self {
        CpiContext { api, templates, config, rng: Mutex::new(rng) }
    }

    /// Talks to the fleet manager at `config.api_url` with the embedded workflow templates.
    pub fn from_config(config: CpiConfig) -> Result<Self> {
        let api = HttpFleetApi::new(&config.api_url)?;

        Ok(CpiContext::new(Arc::new(api), Arc::new(EmbeddedTemplates::new()), config, StdRng::from_os_rng()))
    }

    pub fn api(&self) -> &dyn FleetApi {
        self.api.as_ref()
    }

    pub fn config(&self) -> &CpiConfig {
        &self.config
    }

    pub fn request_id(&self) -> &RequestId {
        &self.config.request_id
    }

    pub async fn reserve_node(&self, hint: Option<&DiskCid>, filter: &Filter) -> Result<NodeId> {
        let reservation = FleetReservation { api: self.api(), templates: self.templates.as_ref(), config: &self.config, rng: &self.rng };

        reservation.reserve_node(hint, filter).await
    }

    pub async fn run_workflow(&self, kind: WorkflowKind, node_id: &NodeId, options: Map<String, Value>) -> Result<()> {
        let bundle = build_bundle(self.templates.as_ref(), kind, self.request_id())?;

        publish_and_run(self.api(), &bundle, node_id, options, RunnerSettings::from(&self.config)).await
    }

    pub async fn node(&self, node_id: &NodeId) -> Result<Node> {
        Ok(Node::from(self.api.get_node(node_id).await?))
    }

    /// The node carrying `tag`; `what` names the tag in the not-found message (e.g. "VM vm-1").
    pub async fn node_by_tag(&self, tag: &str, what: &str) -> Result<Node> {
        find_node_by_tag(self.api(), tag).await?.ok_or_else(|| Error::NotFoundError(format!("{} not found", what)))
    }
}
