mod fleet_fixture;

use bosh_rackhd_cpi::api::fleet_dto::PersistentDiskSettings;
use bosh_rackhd_cpi::domain::cpi::disk_lifecycle::{attach_disk, create_disk, delete_disk, detach_disk, get_disks, has_disk};
use bosh_rackhd_cpi::domain::fleet::fleet_mock::{FleetCall, MockFleet};
use bosh_rackhd_cpi::domain::utils::id::{DiskCid, VmCid};
use bosh_rackhd_cpi::error::Error;
use serde_json::json;

use fleet_fixture::{REQUEST_ID, catalog, context, node, node_with_disk};

fn patches(fleet: &MockFleet) -> usize {
    fleet.count_calls(|call| matches!(call, FleetCall::PatchPersistentDisk(..)))
}

#[tokio::test]
async fn attach_disk_patches_once_and_is_idempotent() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "vm-1", "disk-1"], "disk-1", false));
    let ctx = context(&fleet);

    attach_disk(&ctx, &VmCid::new("vm-1"), &DiskCid::new("disk-1")).await.unwrap();
    assert_eq!(patches(&fleet), 1);
    assert!(fleet.node("n1").unwrap().persistent_disk.is_attached);

    attach_disk(&ctx, &VmCid::new("vm-1"), &DiskCid::new("disk-1")).await.unwrap();
    assert_eq!(patches(&fleet), 1);
}

#[tokio::test]
async fn detach_disk_with_mismatched_disk_fails_without_patch() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "vm-1", "disk-1"], "disk-1", true));
    let ctx = context(&fleet);

    let err = detach_disk(&ctx, &VmCid::new("vm-1"), &DiskCid::new("disk-2")).await.unwrap_err();

    assert_eq!(err.to_string(), "another disk is attached to VM vm-1");
    assert_eq!(patches(&fleet), 0);
}

#[tokio::test]
async fn detach_disk_clears_the_attached_flag() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "vm-1", "disk-1"], "disk-1", true));
    let ctx = context(&fleet);

    detach_disk(&ctx, &VmCid::new("vm-1"), &DiskCid::new("disk-1")).await.unwrap();
    detach_disk(&ctx, &VmCid::new("vm-1"), &DiskCid::new("disk-1")).await.unwrap();

    assert!(!fleet.node("n1").unwrap().persistent_disk.is_attached);
    assert_eq!(patches(&fleet), 1);
}

#[tokio::test]
async fn attach_to_vm_without_disk_is_not_found() {
    let fleet = MockFleet::new();
    fleet.add_node(node("n1", &["reserved", "vm-1"]));
    let ctx = context(&fleet);

    let err = attach_disk(&ctx, &VmCid::new("vm-1"), &DiskCid::new("disk-1")).await.unwrap_err();
    assert!(matches!(err, Error::NotFoundError(_)));
    assert_eq!(err.to_string(), "disk disk-1 not found on VM vm-1");
}

#[tokio::test]
async fn create_disk_without_vm_reserves_a_node_by_size() {
    let fleet = MockFleet::new();
    fleet.add_node(node("small", &[]));
    fleet.add_catalog("small", catalog("small", 1000, "00:00:00:00:00:01"));
    fleet.add_node(node("large", &[]));
    fleet.add_catalog("large", catalog("large", 2500, "00:00:00:00:00:03"));
    let ctx = context(&fleet);

    let disk_cid = create_disk(&ctx, 2500, &json!({}), None).await.unwrap();

    assert_eq!(disk_cid, DiskCid::new(format!("large-{}", REQUEST_ID)));
    let large = fleet.node("large").unwrap();
    assert_eq!(
        large.persistent_disk,
        PersistentDiskSettings { pregenerated_disk_cid: disk_cid.to_string(), disk_cid: disk_cid.to_string(), location: "/dev/sdb".to_string(), is_attached: false }
    );
    assert!(large.tags.contains(&"reserved".to_string()));
    assert!(large.tags.contains(&disk_cid.to_string()));
    assert!(fleet.tags("small").is_empty());
}

#[tokio::test]
async fn failed_create_disk_returns_the_node_to_the_pool() {
    let fleet = MockFleet::new();
    fleet.add_node(node("n1", &[]));
    fleet.add_catalog("n1", catalog("n1", 5000, "00:00:00:00:00:01"));
    fleet.fail_operation("patch_persistent_disk");
    let ctx = context(&fleet);

    let err = create_disk(&ctx, 2500, &json!({}), None).await.unwrap_err();

    assert!(matches!(err, Error::ApiError { status: 500, .. }));
    let n1 = fleet.node("n1").unwrap();
    assert!(n1.tags.is_empty());
    assert_eq!(n1.persistent_disk, PersistentDiskSettings::default());
}

#[tokio::test]
async fn failed_create_disk_on_vm_keeps_the_vm_reservation() {
    let fleet = MockFleet::new();
    fleet.add_node(node("n1", &["reserved", "vm-1"]));
    fleet.add_catalog("n1", catalog("n1", 5000, "00:00:00:00:00:01"));
    fleet.fail_operation("patch_persistent_disk");
    let ctx = context(&fleet);

    assert!(create_disk(&ctx, 2500, &json!({}), Some(&VmCid::new("vm-1"))).await.is_err());
    assert_eq!(fleet.tags("n1"), vec!["reserved".to_string(), "vm-1".to_string()]);
}

#[tokio::test]
async fn create_disk_on_vm_reuses_the_pregenerated_cid() {
    let fleet = MockFleet::new();
    let mut vm_node = node("n1", &["reserved", "vm-1"]);
    vm_node.persistent_disk.pregenerated_disk_cid = "n1-earlier".to_string();
    fleet.add_node(vm_node);
    fleet.add_catalog("n1", catalog("n1", 4000, "00:00:00:00:00:01"));
    let ctx = context(&fleet);

    let disk_cid = create_disk(&ctx, 3000, &json!({}), Some(&VmCid::new("vm-1"))).await.unwrap();

    assert_eq!(disk_cid, DiskCid::new("n1-earlier"));
    assert_eq!(fleet.node("n1").unwrap().persistent_disk.disk_cid, "n1-earlier");
    assert_eq!(fleet.count_calls(|call| matches!(call, FleetCall::PostWorkflow(..))), 0);
}

#[tokio::test]
async fn create_disk_on_vm_checks_capacity_and_existing_disk() {
    let fleet = MockFleet::new();
    fleet.add_node(node("n1", &["reserved", "vm-1"]));
    fleet.add_catalog("n1", catalog("n1", 1000, "00:00:00:00:00:01"));
    fleet.add_node(node_with_disk("n2", &["reserved", "vm-2", "disk-2"], "disk-2", true));
    let ctx = context(&fleet);

    let too_big = create_disk(&ctx, 2000, &json!({}), Some(&VmCid::new("vm-1"))).await.unwrap_err();
    assert!(too_big.to_string().contains("not enough persistent disk space"));

    let second = create_disk(&ctx, 10, &json!({}), Some(&VmCid::new("vm-2"))).await.unwrap_err();
    assert_eq!(second.to_string(), "VM vm-2 already has a persistent disk");
    assert_eq!(patches(&fleet), 0);
}

#[tokio::test]
async fn delete_detached_disk_without_vm_releases_the_node() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "disk-1"], "disk-1", false));
    let ctx = context(&fleet);

    delete_disk(&ctx, &DiskCid::new("disk-1")).await.unwrap();

    let n1 = fleet.node("n1").unwrap();
    assert_eq!(n1.persistent_disk, PersistentDiskSettings::default());
    assert!(n1.tags.is_empty());
}

#[tokio::test]
async fn delete_disk_keeps_reservation_of_vm_node() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "vm-1", "disk-1"], "disk-1", false));
    let ctx = context(&fleet);

    delete_disk(&ctx, &DiskCid::new("disk-1")).await.unwrap();

    assert_eq!(fleet.tags("n1"), vec!["reserved".to_string(), "vm-1".to_string()]);
}

#[tokio::test]
async fn attached_disk_cannot_be_deleted() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "vm-1", "disk-1"], "disk-1", true));
    let ctx = context(&fleet);

    let err = delete_disk(&ctx, &DiskCid::new("disk-1")).await.unwrap_err();

    assert_eq!(err.to_string(), "disk disk-1 is still attached to VM vm-1");
    assert_eq!(patches(&fleet), 0);
}

#[tokio::test]
async fn disk_queries() {
    let fleet = MockFleet::new();
    fleet.add_node(node_with_disk("n1", &["reserved", "vm-1", "disk-1"], "disk-1", true));
    fleet.add_node(node("n2", &["reserved", "vm-2"]));
    fleet.add_node(node("n3", &["dup"]));
    fleet.add_node(node("n4", &["dup"]));
    let ctx = context(&fleet);

    assert!(has_disk(&ctx, &DiskCid::new("disk-1")).await.unwrap());
    assert!(!has_disk(&ctx, &DiskCid::new("disk-9")).await.unwrap());
    assert!(matches!(has_disk(&ctx, &DiskCid::new("dup")).await, Err(Error::ConflictError(_))));

    assert_eq!(get_disks(&ctx, &VmCid::new("vm-1")).await.unwrap(), vec![DiskCid::new("disk-1")]);
    assert!(get_disks(&ctx, &VmCid::new("vm-2")).await.unwrap().is_empty());
}
