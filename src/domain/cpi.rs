pub mod context;
pub mod cpi_command;
pub mod disk_lifecycle;
pub mod stemcell;
pub mod vm_lifecycle;
