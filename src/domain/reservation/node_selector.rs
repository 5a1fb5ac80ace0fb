use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::domain::fleet::fleet_api::FleetApi;
use crate::domain::node::filter::Filter;
use crate::domain::node::node::Node;
use crate::domain::utils::id::DiskCid;
use crate::error::{Error, Result};

/// Resolves the node carrying `tag`, if any. Several nodes sharing one tag is a conflict.
pub async fn find_node_by_tag(api: &dyn FleetApi, tag: &str) -> Result<Option<Node>> {
    let mut nodes = api.get_nodes_by_tag(tag).await?;

    match nodes.len() {
        0 => Ok(None),
        1 => Ok(nodes.pop().map(Node::from)),
        count => {
            log::error!("TagConflict: {} nodes carry tag {}.", count, tag);
            Err(Error::ConflictError(format!("more than one node returned for tag {}", tag)))
        }
    }
}

/// Every node that is free for a new reservation and satisfies `filter`.
///
/// Nodes running a workflow are skipped, which costs one remote query per candidate.
pub async fn eligible_nodes(api: &dyn FleetApi, filter: &Filter) -> Result<Vec<Node>> {
    let mut eligible = Vec::new();

    for node in api.get_nodes().await?.into_iter().map(Node::from) {
        if !node.is_available() {
            continue;
        }

        if !api.get_active_workflows(&node.id).await?.is_empty() {
            log::debug!("Skipping node {}: it has an active workflow.", node.id);
            continue;
        }

        let catalog = if filter.needs_catalog() { Some(api.get_node_catalog(&node.id).await?) } else { None };
        if filter.matches(&node, catalog.as_ref()) {
            eligible.push(node);
        }
    }

    Ok(eligible)
}

/// With a disk hint, returns the node holding that disk. Otherwise draws one eligible node at random.
pub async fn select_node(api: &dyn FleetApi, hint: Option<&DiskCid>, filter: &Filter, rng: &Mutex<StdRng>) -> Result<Node> {
    if let Some(disk_cid) = hint.filter(|cid| !cid.is_empty()) {
        return match find_node_by_tag(api, disk_cid.as_str()).await? {
            Some(node) => Ok(node),
            None => Err(Error::ConflictError(format!("no node returned for disk {}", disk_cid))),
        };
    }

    let candidates = eligible_nodes(api, filter).await?;

    let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let node = candidates.choose(&mut *rng).cloned().ok_or_else(|| Error::NotFoundError("all nodes have been reserved".to_string()))?;

    log::debug!("Selected node {} out of {} candidates.", node.id, candidates.len());
    Ok(node)
}
