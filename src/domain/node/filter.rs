use crate::api::fleet_dto::NodeCatalogDto;
use crate::domain::node::catalog::secondary_disk_size_mb;
use crate::domain::node::node::Node;

/// Requirement a node must meet on top of being available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    AllowAny,
    /// Minimum size of the secondary block device in MB.
    BySize(u64),
}

impl Filter {
    /// Only size filtering looks at the hardware catalog.
    pub fn needs_catalog(&self) -> bool {
        matches!(self, Filter::BySize(_))
    }

    /// A size filter without a catalog never matches.
    pub fn matches(&self, node: &Node, catalog: Option<&NodeCatalogDto>) -> bool {
        if !node.is_available() {
            return false;
        }

        match self {
            Filter::AllowAny => true,
            Filter::BySize(minimum_mb) => catalog.and_then(secondary_disk_size_mb).is_some_and(|size_mb| size_mb >= *minimum_mb),
        }
    }
}
