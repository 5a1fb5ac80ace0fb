use std::io::Read;

use serde_json::Value;

use crate::api::cpi_request_dto::CpiRequestDto;
use crate::domain::config::CpiConfig;
use crate::domain::cpi::context::CpiContext;
use crate::domain::cpi::cpi_command::handle_request;
use crate::error::Result;
use crate::loader::parser::parse_json_reader;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Runs one CPI call: loads the config at `config_path`, reads the request from `input` and executes it.
pub async fn run_cpi(config_path: &str, input: impl Read) -> Result<Value> {
    let config = CpiConfig::load(config_path)?;
    let request: CpiRequestDto = parse_json_reader(input)?;
    log::info!("Request parsed successfully: method '{}' with {} arguments.", request.method, request.arguments.len());

    let ctx = CpiContext::from_config(config)?;

    handle_request(&ctx, &request).await
}
