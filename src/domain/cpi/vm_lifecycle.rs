use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::api::agent_env_dto::{AgentDisksDto, AgentEnvDto, AgentVmDto};
use crate::api::cpi_request_dto::{NetworkDto, NetworksDto};
use crate::domain::cpi::context::CpiContext;
use crate::domain::node::catalog::{PERSISTENT_DISK_LOCATION, SYSTEM_DISK_LOCATION, active_ethernet_mac};
use crate::domain::node::filter::Filter;
use crate::domain::node::node::Node;
use crate::domain::node::tags::{RESERVED_TAG, VM_TAG_PREFIX};
use crate::domain::reservation::node_selector::find_node_by_tag;
use crate::domain::utils::id::{AgentId, DiskCid, NodeId, StemcellCid, VmCid};
use crate::domain::workflow::workflow_builder::WorkflowKind;
use crate::error::{Error, Result};

pub const MANUAL_NETWORK: &str = "manual";
pub const DYNAMIC_NETWORK: &str = "dynamic";

/// Where the provision workflow drops the agent settings on the system disk.
pub const AGENT_SETTINGS_PATH: &str = "/var/vcap/bosh/baremetal-cpi-agent-env.json";

#[derive(Debug, Clone, PartialEq)]
pub struct CreateVmRequest {
    pub agent_id: AgentId,
    pub stemcell_cid: StemcellCid,
    pub cloud_properties: Value,
    pub networks: NetworksDto,
    pub disk_cids: Vec<DiskCid>,
    pub env: Value,
}

/// Checks the networks argument of `create_vm` and fills in the default network type.
///
/// Exactly one network is supported; manual networks need ip, gateway and netmask.
pub fn validate_networks(networks: &NetworksDto) -> Result<(String, NetworkDto)> {
    let (name, mut network) = match networks.iter().collect::<Vec<_>>().as_slice() {
        [(name, network)] => ((*name).clone(), (*network).clone()),
        other => return Err(Error::ValidationError(format!("config error: exactly one network is supported, got {}", other.len()))),
    };

    if network.network_type.is_empty() {
        network.network_type = MANUAL_NETWORK.to_string();
    }

    match network.network_type.as_str() {
        MANUAL_NETWORK => {
            let missing: Vec<&str> = [("ip", &network.ip), ("gateway", &network.gateway), ("netmask", &network.netmask)]
                .into_iter()
                .filter(|(_, value)| value.is_empty())
                .map(|(field, _)| field)
                .collect();

            if !missing.is_empty() {
                return Err(Error::ValidationError(format!("config error: manual network {} is missing {}", name, missing.join(", "))));
            }
        }
        DYNAMIC_NETWORK => {}
        other => return Err(Error::ValidationError(format!("config error: unsupported network type '{}'", other))),
    }

    Ok((name, network))
}

pub fn vm_cid_for_settings_file(file_uuid: &str) -> VmCid {
    VmCid::new(format!("{}{}", VM_TAG_PREFIX, file_uuid))
}

pub fn settings_file_for_vm(vm_cid: &VmCid) -> &str {
    vm_cid.as_str().strip_prefix(VM_TAG_PREFIX).unwrap_or(vm_cid.as_str())
}

fn build_agent_env(ctx: &CpiContext, request: &CreateVmRequest, node: &Node, network_name: String, network: NetworkDto) -> AgentEnvDto {
    let agent = &ctx.config().agent;

    let mut persistent = BTreeMap::new();
    if let Some(disk_cid) = node.disk_cid() {
        persistent.insert(disk_cid.to_string(), PERSISTENT_DISK_LOCATION.to_string());
    }

    AgentEnvDto {
        agent_id: request.agent_id.to_string(),
        vm: AgentVmDto { name: node.id.to_string(), id: node.id.to_string() },
        mbus: agent.mbus.clone(),
        ntp: agent.ntp.clone(),
        blobstore: agent.blobstore.clone(),
        networks: BTreeMap::from([(network_name, network)]),
        disks: AgentDisksDto { system: SYSTEM_DISK_LOCATION.to_string(), ephemeral: String::new(), persistent },
        env: request.env.clone(),
    }
}

/// Keeps a disk CID on hand for a later `create_disk` against this VM.
async fn ensure_disk_placeholder(ctx: &CpiContext, node: &mut Node) -> Result<()> {
    if node.has_persistent_disk() || !node.persistent_disk.pregenerated_disk_cid.is_empty() {
        return Ok(());
    }

    node.persistent_disk.pregenerated_disk_cid = format!("{}-{}", node.id, ctx.request_id());
    ctx.api().patch_persistent_disk(&node.id, &node.persistent_disk).await
}

pub async fn create_vm(ctx: &CpiContext, request: &CreateVmRequest) -> Result<VmCid> {
    if request.agent_id.is_empty() {
        return Err(Error::ValidationError("agent id must not be empty".to_string()));
    }
    let (network_name, mut network) = validate_networks(&request.networks)?;

    let hint = request.disk_cids.first();
    let node_id = ctx.reserve_node(hint, &Filter::AllowAny).await?;

    match provision(ctx, request, &node_id, network_name, &mut network).await {
        Ok(vm_cid) => Ok(vm_cid),
        Err(e) => {
            release_after_failed_create(ctx, &node_id).await;
            Err(e)
        }
    }
}

async fn provision(ctx: &CpiContext, request: &CreateVmRequest, node_id: &NodeId, network_name: String, network: &mut NetworkDto) -> Result<VmCid> {
    let mut node = ctx.node(node_id).await?;

    if network.network_type == MANUAL_NETWORK {
        let catalog = ctx.api().get_node_catalog(node_id).await?;
        network.mac = active_ethernet_mac(node_id, &catalog)?;
    }

    ensure_disk_placeholder(ctx, &mut node).await?;

    let agent_env = build_agent_env(ctx, request, &node, network_name, network.clone());
    let settings_name = format!("agent-settings-{}-{}", node_id, ctx.request_id());
    let file_uuid = ctx.api().upload_file(&settings_name, serde_json::to_vec(&agent_env)?).await?;
    let vm_cid = vm_cid_for_settings_file(&file_uuid);

    let mut options = Map::new();
    options.insert("stemcellFile".to_string(), json!(request.stemcell_cid.as_str()));
    options.insert("agentSettingsFile".to_string(), json!(file_uuid));
    options.insert("agentSettingsPath".to_string(), json!(AGENT_SETTINGS_PATH));
    ctx.run_workflow(WorkflowKind::ProvisionNode, node_id, options).await?;

    ctx.api().add_tags(node_id, &[vm_cid.to_string()]).await?;

    log::info!("Created VM {} on node {} for agent {}.", vm_cid, node_id, request.agent_id);
    Ok(vm_cid)
}

/// Returns a node to the pool after provisioning failed, unless it holds a disk.
async fn release_after_failed_create(ctx: &CpiContext, node_id: &NodeId) {
    let node = match ctx.node(node_id).await {
        Ok(node) => node,
        Err(e) => {
            log::warn!("Could not re-read node {} after failed create_vm: {}", node_id, e);
            return;
        }
    };

    if node.has_persistent_disk() {
        return;
    }

    if let Err(e) = ctx.api().delete_tag(node_id, RESERVED_TAG).await {
        log::warn!("Could not release node {} after failed create_vm: {}", node_id, e);
    }
}

pub async fn delete_vm(ctx: &CpiContext, vm_cid: &VmCid) -> Result<()> {
    let mut node = ctx.node_by_tag(vm_cid.as_str(), &format!("VM {}", vm_cid)).await?;

    ctx.run_workflow(WorkflowKind::DeprovisionNode, &node.id, Map::new()).await?;

    // An attachment cannot outlive its VM.
    if node.persistent_disk.is_attached {
        node.persistent_disk.is_attached = false;
        ctx.api().patch_persistent_disk(&node.id, &node.persistent_disk).await?;
        log::info!("Detached disk {} from deleted VM {}.", node.persistent_disk.disk_cid, vm_cid);
    }

    ctx.api().delete_tag(&node.id, vm_cid.as_str()).await?;

    // A node keeping a persistent disk stays reserved for the VM that will attach it next.
    if !node.has_persistent_disk() {
        ctx.api().delete_tag(&node.id, RESERVED_TAG).await?;
    }

    if let Err(e) = ctx.api().delete_file(settings_file_for_vm(vm_cid)).await {
        log::warn!("Could not delete agent settings of VM {}: {}", vm_cid, e);
    }

    log::info!("Deleted VM {} from node {}.", vm_cid, node.id);
    Ok(())
}

pub async fn has_vm(ctx: &CpiContext, vm_cid: &VmCid) -> Result<bool> {
    Ok(find_node_by_tag(ctx.api(), vm_cid.as_str()).await?.is_some())
}

/// Node tags are reserved for CPI bookkeeping, so metadata is only logged.
pub async fn set_vm_metadata(_ctx: &CpiContext, vm_cid: &VmCid, metadata: &Value) -> Result<()> {
    log::debug!("Ignoring metadata for VM {}: {}", vm_cid, metadata);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn networks(network: NetworkDto) -> NetworksDto {
        BTreeMap::from([("default".to_string(), network)])
    }

    #[test]
    fn network_type_defaults_to_manual() {
        let network = NetworkDto { ip: "10.0.0.5".to_string(), gateway: "10.0.0.1".to_string(), netmask: "255.255.255.0".to_string(), ..Default::default() };

        let (name, network) = validate_networks(&networks(network)).unwrap();

        assert_eq!(name, "default");
        assert_eq!(network.network_type, MANUAL_NETWORK);
    }

    #[test]
    fn manual_network_needs_addresses() {
        let network = NetworkDto { ip: "10.0.0.5".to_string(), ..Default::default() };

        let err = validate_networks(&networks(network)).unwrap_err();
        assert_eq!(err.to_string(), "config error: manual network default is missing gateway, netmask");
    }

    #[test]
    fn dynamic_network_needs_nothing() {
        let network = NetworkDto { network_type: DYNAMIC_NETWORK.to_string(), ..Default::default() };
        assert!(validate_networks(&networks(network)).is_ok());
    }

    #[test]
    fn exactly_one_network_is_supported() {
        assert!(validate_networks(&NetworksDto::new()).is_err());

        let mut two = networks(NetworkDto { network_type: DYNAMIC_NETWORK.to_string(), ..Default::default() });
        two.insert("second".to_string(), NetworkDto { network_type: DYNAMIC_NETWORK.to_string(), ..Default::default() });
        assert!(validate_networks(&two).is_err());
    }

    #[test]
    fn unknown_network_type_is_rejected() {
        let network = NetworkDto { network_type: "vip".to_string(), ..Default::default() };
        assert!(matches!(validate_networks(&networks(network)), Err(Error::ValidationError(_))));
    }

    #[test]
    fn vm_cid_and_settings_file_map_onto_each_other() {
        let vm_cid = vm_cid_for_settings_file("1234-abcd");
        assert_eq!(vm_cid.as_str(), "vm-1234-abcd");
        assert_eq!(settings_file_for_vm(&vm_cid), "1234-abcd");
    }
}
