pub mod config;
pub mod cpi;
pub mod fleet;
pub mod node;
pub mod reservation;
pub mod utils;
pub mod workflow;
