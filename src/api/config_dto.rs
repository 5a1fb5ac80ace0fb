use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw shape of the CPI configuration file passed via `--configPath`.
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct CpiConfigDto {
    pub api_url: String,
    pub agent: AgentConfigDto,
    #[serde(default)]
    pub max_reserve_node_attempts: Option<i64>,
    /// Seconds.
    #[serde(default)]
    pub run_workflow_timeout: Option<u64>,
    /// Seconds.
    #[serde(default)]
    pub workflow_poll_interval: Option<u64>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct AgentConfigDto {
    pub mbus: String,
    #[serde(default)]
    pub ntp: Vec<String>,
    pub blobstore: BlobstoreDto,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct BlobstoreDto {
    pub provider: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}
