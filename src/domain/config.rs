use std::time::Duration;

use uuid::Uuid;

use crate::api::config_dto::{AgentConfigDto, CpiConfigDto};
use crate::domain::utils::id::RequestId;
use crate::error::{Error, Result};
use crate::loader::parser::parse_json_file;

pub const DEFAULT_MAX_RESERVE_NODE_ATTEMPTS: u32 = 5;
pub const DEFAULT_RUN_WORKFLOW_TIMEOUT_S: u64 = 1200;
pub const DEFAULT_WORKFLOW_POLL_INTERVAL_S: u64 = 5;

pub const OBM_SERVICE_ENV: &str = "RACKHD_OBM_SERVICE";
pub const OBM_USER_ENV: &str = "RACKHD_OBM_USER";
pub const OBM_PASSWORD_ENV: &str = "RACKHD_OBM_PASSWORD";

/// Credentials used to fill in OBM settings for nodes that have none.
#[derive(Debug, Clone, PartialEq)]
pub struct ObmDefaults {
    pub service: String,
    pub user: String,
    pub password: String,
}

impl ObmDefaults {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let service = lookup(OBM_SERVICE_ENV).filter(|s| !s.is_empty())?;
        let user = lookup(OBM_USER_ENV).unwrap_or_default();
        let password = lookup(OBM_PASSWORD_ENV).unwrap_or_default();

        Some(ObmDefaults { service, user, password })
    }
}

#[derive(Debug, Clone)]
pub struct CpiConfig {
    pub api_url: String,
    pub agent: AgentConfigDto,
    pub max_reserve_node_attempts: u32,
    pub run_workflow_timeout: Duration,
    pub workflow_poll_interval: Duration,
    pub request_id: RequestId,
    pub obm_defaults: Option<ObmDefaults>,
}

impl CpiConfig {
    /// Loads and validates the config file, picking up OBM defaults from the environment.
    pub fn load(path: &str) -> Result<Self> {
        let dto: CpiConfigDto = parse_json_file(path)?;
        let mut config = CpiConfig::try_from(dto)?;
        config.obm_defaults = ObmDefaults::from_env();

        log::info!("Loaded CPI config from '{}' (api_url: {}, request_id: {}).", path, config.api_url, config.request_id);

        Ok(config)
    }
}

impl TryFrom<CpiConfigDto> for CpiConfig {
    type Error = Error;

    fn try_from(dto: CpiConfigDto) -> Result<Self> {
        if dto.api_url.trim().is_empty() {
            return Err(Error::ConfigError("api_url must be specified".to_string()));
        }
        if dto.agent.mbus.trim().is_empty() {
            return Err(Error::ConfigError("agent.mbus must be specified".to_string()));
        }
        if dto.agent.blobstore.provider.trim().is_empty() {
            return Err(Error::ConfigError("agent.blobstore.provider must be specified".to_string()));
        }

        let max_reserve_node_attempts = match dto.max_reserve_node_attempts {
            Some(attempts) if attempts < 0 => {
                return Err(Error::ConfigError(format!("max_reserve_node_attempts must not be negative, got {}", attempts)));
            }
            Some(0) | None => DEFAULT_MAX_RESERVE_NODE_ATTEMPTS,
            Some(attempts) => u32::try_from(attempts).map_err(|_| Error::ConfigError(format!("max_reserve_node_attempts {} is too large", attempts)))?,
        };

        let run_workflow_timeout = Duration::from_secs(dto.run_workflow_timeout.filter(|t| *t > 0).unwrap_or(DEFAULT_RUN_WORKFLOW_TIMEOUT_S));
        let workflow_poll_interval = Duration::from_secs(dto.workflow_poll_interval.filter(|t| *t > 0).unwrap_or(DEFAULT_WORKFLOW_POLL_INTERVAL_S));

        let request_id = match dto.request_id {
            Some(id) if !id.trim().is_empty() => RequestId::new(id),
            _ => RequestId::new(Uuid::new_v4().to_string()),
        };

        Ok(CpiConfig {
            api_url: dto.api_url.trim_end_matches('/').to_string(),
            agent: dto.agent,
            max_reserve_node_attempts,
            run_workflow_timeout,
            workflow_poll_interval,
            request_id,
            obm_defaults: None,
        })
    }
}
