/// Marks a node as claimed by a CPI invocation.
pub const RESERVED_TAG: &str = "reserved";

/// Set by operators to keep a node out of the pool.
pub const BLOCKED_TAG: &str = "blocked";

/// Every VM CID starts with this prefix, so a node carrying such a tag hosts a VM.
pub const VM_TAG_PREFIX: &str = "vm-";

pub fn is_vm_tag(tag: &str) -> bool {
    tag.starts_with(VM_TAG_PREFIX) && tag.len() > VM_TAG_PREFIX.len()
}
