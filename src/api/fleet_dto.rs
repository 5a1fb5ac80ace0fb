use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node record as returned by `GET /nodes` and `GET /nodes/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    #[serde(default, alias = "obmSettings")]
    pub obms: Vec<ObmSettingDto>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub persistent_disk: PersistentDiskSettings,

    #[serde(flatten)]
    pub extra_fields: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObmSettingDto {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub config: Value,
}

/// Persistent disk bookkeeping stored on the node itself.
///
/// `is_attached` implies a non-empty `disk_cid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentDiskSettings {
    #[serde(default)]
    pub pregenerated_disk_cid: String,
    #[serde(default)]
    pub disk_cid: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_attached: bool,
}

/// Body of `PATCH /nodes/{id}` for disk bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct PersistentDiskPatchDto<'a> {
    pub persistent_disk: &'a PersistentDiskSettings,
}

/// Body of `PATCH /nodes/{id}/tags`.
#[derive(Debug, Clone, Serialize)]
pub struct TagsPatchDto<'a> {
    pub tags: &'a [String],
}

/// The `ohai` hardware catalog of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeCatalogDto {
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub data: OhaiDataDto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhaiDataDto {
    #[serde(default)]
    pub block_device: BTreeMap<String, BlockDeviceDto>,
    #[serde(default)]
    pub network: OhaiNetworkDto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockDeviceDto {
    /// Reported as a string by ohai.
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub removable: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhaiNetworkDto {
    #[serde(default)]
    pub interfaces: BTreeMap<String, OhaiInterfaceDto>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhaiInterfaceDto {
    #[serde(default)]
    pub encapsulation: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub addresses: BTreeMap<String, OhaiAddressDto>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OhaiAddressDto {
    #[serde(default)]
    pub family: String,
}

/// A remote workflow (graph) instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstanceDto {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(default, rename = "injectableName")]
    pub injectable_name: String,
    #[serde(default, alias = "_status")]
    pub status: String,
    #[serde(default, rename = "pendingTasks")]
    pub pending_tasks: Vec<Value>,
}

/// Body of `PUT /nodes/{id}/workflows/action`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowActionDto {
    pub command: String,
}
