pub mod fleet_reservation;
pub mod node_selector;
pub mod reservation_coordinator;
