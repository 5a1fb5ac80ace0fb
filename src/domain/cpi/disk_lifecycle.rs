use serde_json::Value;

use crate::api::fleet_dto::PersistentDiskSettings;
use crate::domain::cpi::context::CpiContext;
use crate::domain::node::catalog::{PERSISTENT_DISK_LOCATION, secondary_disk_size_mb};
use crate::domain::node::filter::Filter;
use crate::domain::node::node::Node;
use crate::domain::node::tags::RESERVED_TAG;
use crate::domain::reservation::node_selector::find_node_by_tag;
use crate::domain::utils::id::{DiskCid, NodeId, VmCid};
use crate::error::{Error, Result};

fn generated_disk_cid(ctx: &CpiContext, node_id: &NodeId) -> DiskCid {
    DiskCid::new(format!("{}-{}", node_id, ctx.request_id()))
}

async fn node_for_vm(ctx: &CpiContext, vm_cid: &VmCid) -> Result<Node> {
    ctx.node_by_tag(vm_cid.as_str(), &format!("VM {}", vm_cid)).await
}

/// Picks the node and CID for a disk that goes onto an existing VM.
async fn disk_on_vm(ctx: &CpiContext, size_mb: u64, vm_cid: &VmCid) -> Result<(NodeId, DiskCid, PersistentDiskSettings)> {
    let node = node_for_vm(ctx, vm_cid).await?;
    if node.has_persistent_disk() {
        return Err(Error::ValidationError(format!("VM {} already has a persistent disk", vm_cid)));
    }

    let catalog = ctx.api().get_node_catalog(&node.id).await?;
    let available_mb = secondary_disk_size_mb(&catalog).unwrap_or(0);
    if available_mb < size_mb {
        return Err(Error::ValidationError(format!("VM {} has not enough persistent disk space: requested {} MB, available {} MB", vm_cid, size_mb, available_mb)));
    }

    let disk_cid = match node.persistent_disk.pregenerated_disk_cid.as_str() {
        "" => generated_disk_cid(ctx, &node.id),
        pregenerated => DiskCid::new(pregenerated),
    };

    Ok((node.id, disk_cid, node.persistent_disk))
}

pub async fn create_disk(ctx: &CpiContext, size_mb: u64, cloud_properties: &Value, vm_cid: Option<&VmCid>) -> Result<DiskCid> {
    log::debug!("Creating disk of {} MB (cloud properties: {}).", size_mb, cloud_properties);

    match vm_cid.filter(|cid| !cid.is_empty()) {
        Some(vm_cid) => {
            let (node_id, disk_cid, settings) = disk_on_vm(ctx, size_mb, vm_cid).await?;
            record_disk(ctx, &node_id, disk_cid, settings).await
        }
        None => {
            let node_id = ctx.reserve_node(None, &Filter::BySize(size_mb)).await?;
            let disk_cid = generated_disk_cid(ctx, &node_id);

            let node = match ctx.node(&node_id).await {
                Ok(node) => node,
                Err(e) => {
                    release_after_failed_create(ctx, &node_id, None).await;
                    return Err(e);
                }
            };

            let recorded = record_disk(ctx, &node_id, disk_cid, node.persistent_disk.clone()).await;
            if recorded.is_err() {
                release_after_failed_create(ctx, &node_id, Some(&node.persistent_disk)).await;
            }
            recorded
        }
    }
}

/// Writes the disk bookkeeping onto the node and tags it with the disk CID.
async fn record_disk(ctx: &CpiContext, node_id: &NodeId, disk_cid: DiskCid, mut settings: PersistentDiskSettings) -> Result<DiskCid> {
    settings.pregenerated_disk_cid = disk_cid.to_string();
    settings.disk_cid = disk_cid.to_string();
    settings.location = PERSISTENT_DISK_LOCATION.to_string();
    settings.is_attached = false;

    ctx.api().patch_persistent_disk(node_id, &settings).await?;
    ctx.api().add_tags(node_id, &[disk_cid.to_string()]).await?;

    log::info!("Created disk {} on node {}.", disk_cid, node_id);
    Ok(disk_cid)
}

/// Undoes a disk reservation that never got its disk tag, restoring the node's previous disk settings.
async fn release_after_failed_create(ctx: &CpiContext, node_id: &NodeId, previous: Option<&PersistentDiskSettings>) {
    if let Some(previous) = previous {
        if let Err(e) = ctx.api().patch_persistent_disk(node_id, previous).await {
            log::warn!("Could not restore disk settings of node {} after failed create_disk: {}", node_id, e);
        }
    }

    if let Err(e) = ctx.api().delete_tag(node_id, RESERVED_TAG).await {
        log::warn!("Could not release node {} after failed create_disk: {}", node_id, e);
    }
}

/// Resolves the VM's node and checks that `disk_cid` is the disk it holds.
async fn node_holding_disk(ctx: &CpiContext, vm_cid: &VmCid, disk_cid: &DiskCid) -> Result<Node> {
    let node = node_for_vm(ctx, vm_cid).await?;

    match node.disk_cid() {
        None => Err(Error::NotFoundError(format!("disk {} not found on VM {}", disk_cid, vm_cid))),
        Some(held) if held != *disk_cid => Err(Error::ValidationError(format!("another disk is attached to VM {}", vm_cid))),
        Some(_) => Ok(node),
    }
}

pub async fn attach_disk(ctx: &CpiContext, vm_cid: &VmCid, disk_cid: &DiskCid) -> Result<()> {
    let mut node = node_holding_disk(ctx, vm_cid, disk_cid).await?;

    if node.persistent_disk.is_attached {
        log::info!("Disk {} is already attached to VM {}.", disk_cid, vm_cid);
        return Ok(());
    }

    node.persistent_disk.is_attached = true;
    ctx.api().patch_persistent_disk(&node.id, &node.persistent_disk).await?;

    log::info!("Attached disk {} to VM {}.", disk_cid, vm_cid);
    Ok(())
}

pub async fn detach_disk(ctx: &CpiContext, vm_cid: &VmCid, disk_cid: &DiskCid) -> Result<()> {
    let mut node = node_holding_disk(ctx, vm_cid, disk_cid).await?;

    if !node.persistent_disk.is_attached {
        log::info!("Disk {} is already detached from VM {}.", disk_cid, vm_cid);
        return Ok(());
    }

    node.persistent_disk.is_attached = false;
    ctx.api().patch_persistent_disk(&node.id, &node.persistent_disk).await?;

    log::info!("Detached disk {} from VM {}.", disk_cid, vm_cid);
    Ok(())
}

pub async fn delete_disk(ctx: &CpiContext, disk_cid: &DiskCid) -> Result<()> {
    let node = ctx.node_by_tag(disk_cid.as_str(), &format!("disk {}", disk_cid)).await?;

    if node.persistent_disk.is_attached {
        let vm = node.vm_cid().map(|cid| cid.to_string()).unwrap_or_default();
        return Err(Error::ValidationError(format!("disk {} is still attached to VM {}", disk_cid, vm)));
    }

    ctx.api().patch_persistent_disk(&node.id, &PersistentDiskSettings::default()).await?;
    ctx.api().delete_tag(&node.id, disk_cid.as_str()).await?;

    if node.vm_cid().is_none() {
        ctx.api().delete_tag(&node.id, RESERVED_TAG).await?;
    }

    log::info!("Deleted disk {} from node {}.", disk_cid, node.id);
    Ok(())
}

pub async fn has_disk(ctx: &CpiContext, disk_cid: &DiskCid) -> Result<bool> {
    Ok(find_node_by_tag(ctx.api(), disk_cid.as_str()).await?.is_some())
}

pub async fn get_disks(ctx: &CpiContext, vm_cid: &VmCid) -> Result<Vec<DiskCid>> {
    Ok(node_for_vm(ctx, vm_cid).await?.disk_cid().into_iter().collect())
}
