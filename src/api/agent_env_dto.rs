use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::config_dto::BlobstoreDto;
use crate::api::cpi_request_dto::NetworkDto;

/// Bootstrap settings read by the BOSH agent on first boot.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct AgentEnvDto {
    pub agent_id: String,
    pub vm: AgentVmDto,
    pub mbus: String,
    pub ntp: Vec<String>,
    pub blobstore: BlobstoreDto,
    pub networks: BTreeMap<String, NetworkDto>,
    pub disks: AgentDisksDto,
    pub env: Value,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct AgentVmDto {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct AgentDisksDto {
    pub system: String,
    pub ephemeral: String,
    pub persistent: BTreeMap<String, String>,
}
