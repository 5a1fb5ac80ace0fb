use serde::de::DeserializeOwned;
use std::fs;
use std::io::Read;

use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(Error::IoError)?;

    parse_json_str(&data)
}

pub fn parse_json_str<T: DeserializeOwned>(data: &str) -> Result<T> {
    let parsed_data: T = serde_json::from_str(data).map_err(Error::DeserializationError)?;

    Ok(parsed_data)
}

/// Reads the whole reader (stdin for a CPI call) and parses it as one JSON document.
pub fn parse_json_reader<T: DeserializeOwned>(mut reader: impl Read) -> Result<T> {
    let mut data = String::new();
    reader.read_to_string(&mut data)?;

    parse_json_str(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn reader_and_str_agree() {
        let raw = r#"{"method": "has_vm", "arguments": ["vm-1"]}"#;
        let from_reader: Value = parse_json_reader(raw.as_bytes()).unwrap();
        let from_str: Value = parse_json_str(raw).unwrap();

        assert_eq!(from_reader, from_str);
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let result: Result<Value> = parse_json_str("{not json");
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result: Result<Value> = parse_json_file("/nonexistent/cpi.json");
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
