pub mod catalog;
pub mod filter;
pub mod node;
pub mod tags;
