pub mod agent_env_dto;
pub mod config_dto;
pub mod cpi_request_dto;
pub mod cpi_response_dto;
pub mod fleet_dto;
