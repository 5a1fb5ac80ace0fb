use crate::api::fleet_dto::{NodeDto, ObmSettingDto, PersistentDiskSettings};
use crate::domain::node::tags::{BLOCKED_TAG, RESERVED_TAG, is_vm_tag};
use crate::domain::utils::id::{DiskCid, NodeId, VmCid};

pub const AVAILABLE_STATUS: &str = "available";

/// A physical machine as seen by one CPI invocation.
///
/// This is a snapshot; the fleet manager owns the real record.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub obms: Vec<ObmSettingDto>,
    pub status: String,
    pub tags: Vec<String>,
    pub persistent_disk: PersistentDiskSettings,
}

impl From<NodeDto> for Node {
    fn from(dto: NodeDto) -> Self {
        Node { id: NodeId::new(dto.id), obms: dto.obms, status: dto.status, tags: dto.tags, persistent_disk: dto.persistent_disk }
    }
}

impl Node {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_reserved(&self) -> bool {
        self.has_tag(RESERVED_TAG)
    }

    pub fn is_blocked(&self) -> bool {
        self.has_tag(BLOCKED_TAG)
    }

    pub fn vm_cid(&self) -> Option<VmCid> {
        self.tags.iter().find(|t| is_vm_tag(t)).map(VmCid::new)
    }

    pub fn disk_cid(&self) -> Option<DiskCid> {
        Some(&self.persistent_disk.disk_cid).filter(|cid| !cid.is_empty()).map(DiskCid::new)
    }

    pub fn has_persistent_disk(&self) -> bool {
        !self.persistent_disk.disk_cid.is_empty()
    }

    pub fn has_obm_settings(&self) -> bool {
        !self.obms.is_empty()
    }

    pub fn has_available_status(&self) -> bool {
        self.status.is_empty() || self.status.eq_ignore_ascii_case(AVAILABLE_STATUS)
    }

    /// Everything that makes a node eligible for a fresh reservation,
    /// except the live check for running workflows.
    pub fn is_available(&self) -> bool {
        self.has_available_status() && !self.is_reserved() && !self.is_blocked() && self.vm_cid().is_none() && self.has_obm_settings() && !self.has_persistent_disk()
    }
}
