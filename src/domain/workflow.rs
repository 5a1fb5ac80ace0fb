pub mod template_repository;
pub mod workflow_builder;
pub mod workflow_publisher;
pub mod workflow_runner;
pub mod workflow_status;
