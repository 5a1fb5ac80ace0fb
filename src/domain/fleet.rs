pub mod fleet_api;
pub mod fleet_endpoint;
pub mod fleet_mock;
pub mod http_fleet_api;
