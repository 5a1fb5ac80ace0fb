use crate::api::fleet_dto::NodeCatalogDto;
use crate::domain::utils::id::NodeId;
use crate::error::{Error, Result};

/// Block device that holds the persistent disk.
pub const PERSISTENT_DISK_DEVICE: &str = "sdb";
pub const PERSISTENT_DISK_LOCATION: &str = "/dev/sdb";
pub const SYSTEM_DISK_LOCATION: &str = "/dev/sda";

const ETHERNET_ENCAPSULATION: &str = "Ethernet";
const INTERFACE_UP: &str = "up";
const LINK_LAYER_FAMILY: &str = "lladdr";

/// Size of the secondary block device in MB, if the catalog reports a parseable one.
pub fn secondary_disk_size_mb(catalog: &NodeCatalogDto) -> Option<u64> {
    catalog.data.block_device.get(PERSISTENT_DISK_DEVICE).and_then(|device| device.size.trim().parse::<u64>().ok())
}

/// MAC address of the single active Ethernet interface of a node.
pub fn active_ethernet_mac(node_id: &NodeId, catalog: &NodeCatalogDto) -> Result<String> {
    let active: Vec<(&String, String)> = catalog
        .data
        .network
        .interfaces
        .iter()
        .filter(|(_, interface)| interface.encapsulation == ETHERNET_ENCAPSULATION && interface.state == INTERFACE_UP)
        .filter_map(|(name, interface)| {
            interface.addresses.iter().find(|(_, address)| address.family == LINK_LAYER_FAMILY).map(|(mac, _)| (name, mac.clone()))
        })
        .collect();

    match active.as_slice() {
        [] => Err(Error::NotFoundError(format!("no active network interface found on node {}", node_id))),
        [(_, mac)] => Ok(mac.clone()),
        many => {
            let names: Vec<&str> = many.iter().map(|(name, _)| name.as_str()).collect();
            Err(Error::ValidationError(format!("node {} has more than one active network interface: {}", node_id, names.join(", "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(value: serde_json::Value) -> NodeCatalogDto {
        serde_json::from_value(json!({"node": "n1", "source": "ohai", "data": value})).unwrap()
    }

    #[test]
    fn reads_secondary_disk_size() {
        let c = catalog(json!({"block_device": {"sda": {"size": "100"}, "sdb": {"size": "2500"}}}));
        assert_eq!(secondary_disk_size_mb(&c), Some(2500));
    }

    #[test]
    fn missing_or_garbled_secondary_disk_has_no_size() {
        assert_eq!(secondary_disk_size_mb(&catalog(json!({"block_device": {"sda": {"size": "100"}}}))), None);
        assert_eq!(secondary_disk_size_mb(&catalog(json!({"block_device": {"sdb": {"size": "big"}}}))), None);
    }

    #[test]
    fn picks_mac_of_single_active_ethernet_interface() {
        let c = catalog(json!({"network": {"interfaces": {
            "lo": {"encapsulation": "Loopback", "state": "up", "addresses": {"127.0.0.1": {"family": "inet"}}},
            "eth0": {"encapsulation": "Ethernet", "state": "up", "addresses": {"10.0.0.5": {"family": "inet"}, "00:1e:67:aa:bb:cc": {"family": "lladdr"}}},
            "eth1": {"encapsulation": "Ethernet", "state": "down", "addresses": {"00:1e:67:aa:bb:cd": {"family": "lladdr"}}}
        }}}));

        assert_eq!(active_ethernet_mac(&NodeId::new("n1"), &c).unwrap(), "00:1e:67:aa:bb:cc");
    }

    #[test]
    fn zero_or_many_active_interfaces_is_an_error() {
        let none = catalog(json!({"network": {"interfaces": {}}}));
        assert!(matches!(active_ethernet_mac(&NodeId::new("n1"), &none), Err(Error::NotFoundError(_))));

        let two = catalog(json!({"network": {"interfaces": {
            "eth0": {"encapsulation": "Ethernet", "state": "up", "addresses": {"00:1e:67:aa:bb:cc": {"family": "lladdr"}}},
            "eth1": {"encapsulation": "Ethernet", "state": "up", "addresses": {"00:1e:67:aa:bb:cd": {"family": "lladdr"}}}
        }}}));
        let err = active_ethernet_mac(&NodeId::new("n1"), &two).unwrap_err();
        assert_eq!(err.to_string(), "node n1 has more than one active network interface: eth0, eth1");
    }
}
