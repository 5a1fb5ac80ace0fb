use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct Id<T> {
    pub id: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Id { id: id.into(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for String {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {:?}", display_name, self.id)
    }
}

// Ids travel as plain strings on the wire.
impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Id::new)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct NodeTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct VmCidTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct DiskCidTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct StemcellCidTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct RequestTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct WorkflowInstanceTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct AgentTag;

pub type NodeId = Id<NodeTag>;
pub type VmCid = Id<VmCidTag>;
pub type DiskCid = Id<DiskCidTag>;
pub type StemcellCid = Id<StemcellCidTag>;
pub type RequestId = Id<RequestTag>;
pub type WorkflowInstanceId = Id<WorkflowInstanceTag>;
pub type AgentId = Id<AgentTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_names_the_id_kind() {
        let node_id = NodeId::new("5665a65a0561790005b77b85");
        assert_eq!(format!("{:?}", node_id), "NodeId: \"5665a65a0561790005b77b85\"");
        assert_eq!(format!("{:?}", DiskCid::new("d")), "DiskCidId: \"d\"");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let vm_cid = VmCid::new("vm-1");
        assert_eq!(serde_json::to_string(&vm_cid).unwrap(), "\"vm-1\"");

        let parsed: VmCid = serde_json::from_str("\"vm-2\"").unwrap();
        assert_eq!(parsed, VmCid::new("vm-2"));
    }
}
