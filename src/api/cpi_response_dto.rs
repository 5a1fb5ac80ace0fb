use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// The single JSON document written to stdout at the end of a CPI call.
#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct CpiResponseDto {
    pub result: Value,
    pub error: Option<CpiErrorDto>,
    pub log: String,
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct CpiErrorDto {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub ok_to_retry: bool,
}

impl CpiResponseDto {
    pub fn success(result: Value, log: String) -> Self {
        CpiResponseDto { result, error: None, log }
    }

    pub fn failure(error: &Error, log: String) -> Self {
        CpiResponseDto {
            result: Value::Null,
            error: Some(CpiErrorDto { error_type: error.bosh_type().to_string(), message: error.to_string(), ok_to_retry: error.is_retryable() }),
            log,
        }
    }
}
