use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One CPI call as sent by the director on stdin.
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct CpiRequestDto {
    pub method: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(default)]
    pub context: Value,
}

/// A single network entry of `create_vm`.
///
/// The same shape is handed to the agent, enriched with the resolved MAC address.
#[derive(Debug, Deserialize, Clone, Serialize, Default, PartialEq)]
pub struct NetworkDto {
    #[serde(default, rename = "type")]
    pub network_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub netmask: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gateway: String,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub default: Vec<String>,
    #[serde(default)]
    pub cloud_properties: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac: String,
}

pub type NetworksDto = BTreeMap<String, NetworkDto>;
