// Interface index - resolves audited device interfaces from subnets and addresses

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::{CanonicalCidr, DeviceRoutingTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceOwner {
    pub device_id: String,
    pub interface: String,
}

/// Maps every audited device's local interface subnets to the owning device.
///
/// Populated from a single writer once all device tables are built; readers
/// only see it through the audit run after that point.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct GlobalInterfaceIndex {
    entries: BTreeMap<CanonicalCidr, InterfaceOwner>,
}

impl GlobalInterfaceIndex {
    pub fn new() -> Self {
        GlobalInterfaceIndex {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        subnet: CanonicalCidr,
        device_id: &str,
        interface: &str,
    ) -> Option<InterfaceOwner> {
        self.entries.insert(
            subnet,
            InterfaceOwner {
                device_id: device_id.to_string(),
                interface: interface.to_string(),
            },
        )
    }

    /// Insert every local interface of a device table
    pub fn register_table(&mut self, table: &DeviceRoutingTable) {
        for (interface, subnet) in table.local_interfaces() {
            if let Some(previous) = self.insert(subnet.clone(), table.device_id(), interface) {
                if previous.device_id != table.device_id() {
                    tracing::warn!(
                        "Interface subnet {} seen on both {} and {}",
                        subnet,
                        previous.device_id,
                        table.device_id()
                    );
                }
            }
        }
    }

    /// Drop every interface owned by `device_id`
    pub fn remove_device(&mut self, device_id: &str) {
        self.entries.retain(|_, owner| owner.device_id != device_id);
    }

    pub fn get(&self, subnet: &str) -> Option<&InterfaceOwner> {
        self.entries.get(subnet)
    }

    /// Find the interface whose subnet is the most specific one containing `ip`
    pub fn resolve(&self, ip: Ipv4Addr) -> Option<&InterfaceOwner> {
        let mut best_match: Option<(&InterfaceOwner, u8)> = None;

        for (subnet, owner) in &self.entries {
            if let Some(prefix_len) = matches_cidr(subnet, ip) {
                match best_match {
                    None => best_match = Some((owner, prefix_len)),
                    Some((_, current_len)) if prefix_len > current_len => {
                        best_match = Some((owner, prefix_len));
                    }
                    _ => {}
                }
            }
        }

        best_match.map(|(owner, _)| owner)
    }

    /// Audited devices that own a next hop of any route in `table`
    pub fn adjacent_devices(&self, table: &DeviceRoutingTable) -> BTreeSet<String> {
        table
            .routes()
            .iter()
            .flat_map(|(_, route)| route.next_hops.iter())
            .filter_map(|next_hop| self.resolve(*next_hop))
            .filter(|owner| owner.device_id != table.device_id())
            .map(|owner| owner.device_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check if an IP falls inside a canonical subnet and return the prefix length if it does
pub(crate) fn matches_cidr(cidr: &str, ip: Ipv4Addr) -> Option<u8> {
    let (network, prefix) = cidr.split_once('/')?;
    let network: Ipv4Addr = network.parse().ok()?;
    let prefix_len: u8 = prefix.parse().ok()?;

    ip_v4_matches(network, ip, prefix_len).then_some(prefix_len)
}

fn ip_v4_matches(network: Ipv4Addr, addr: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len > 32 {
        return false;
    }

    let network_bits = u32::from(network);
    let addr_bits = u32::from(addr);

    let mask = if prefix_len == 32 {
        0xFFFFFFFF
    } else {
        0xFFFFFFFF << (32 - prefix_len)
    };

    (network_bits & mask) == (addr_bits & mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_device_table;

    #[test]
    fn test_ipv4_matches() {
        let network: Ipv4Addr = "192.168.1.0".parse().unwrap();
        let addr1: Ipv4Addr = "192.168.1.100".parse().unwrap();
        let addr2: Ipv4Addr = "192.168.2.100".parse().unwrap();

        assert!(ip_v4_matches(network, addr1, 24));
        assert!(!ip_v4_matches(network, addr2, 24));
    }

    #[test]
    fn test_matches_cidr() {
        let ip: Ipv4Addr = "192.168.1.100".parse().unwrap();

        assert_eq!(matches_cidr("192.168.1.0/24", ip), Some(24));
        assert_eq!(matches_cidr("192.168.0.0/16", ip), Some(16));
        assert_eq!(matches_cidr("0.0.0.0/0", ip), Some(0));
        assert_eq!(matches_cidr("192.168.2.0/24", ip), None);
        assert_eq!(matches_cidr("192.168.1.0", ip), None);
    }

    #[test]
    fn test_resolve_prefers_most_specific() {
        let mut index = GlobalInterfaceIndex::new();
        index.insert("10.0.0.0/24".to_string(), "R1", "Gi0/0");
        index.insert("10.0.0.2/32".to_string(), "R2", "Gi0/1");

        let owner = index.resolve("10.0.0.2".parse().unwrap()).unwrap();
        assert_eq!(owner.device_id, "R2");

        let owner = index.resolve("10.0.0.9".parse().unwrap()).unwrap();
        assert_eq!(owner.device_id, "R1");

        assert!(index.resolve("172.16.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn test_adjacent_devices() {
        let r1 = build_device_table(
            "R1",
            "L 10.0.0.1/32 is directly connected, Gi0/0\nS 0.0.0.0/0 [1/0] via 10.0.0.2\n",
        )
        .unwrap();
        let r2 = build_device_table(
            "R2",
            "L 10.0.0.2/32 is directly connected, Gi0/1\nS 10.50.0.0/16 [1/0] via 10.0.0.1\n",
        )
        .unwrap();

        let mut index = GlobalInterfaceIndex::new();
        index.register_table(&r1);
        index.register_table(&r2);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("10.0.0.1/32").unwrap().interface, "Gi0/0");
        assert!(index.adjacent_devices(&r1).contains("R2"));
        assert!(index.adjacent_devices(&r2).contains("R1"));
    }

    #[test]
    fn test_remove_device_keeps_other_owners() {
        let mut index = GlobalInterfaceIndex::new();
        index.insert("10.0.0.1/32".to_string(), "R1", "Gi0/0");
        index.insert("10.0.0.2/32".to_string(), "R2", "Gi0/1");
        index.insert("10.0.1.1/32".to_string(), "R1", "Gi0/2");

        index.remove_device("R1");

        assert_eq!(index.len(), 1);
        assert!(index.get("10.0.0.1/32").is_none());
        assert_eq!(index.get("10.0.0.2/32").unwrap().device_id, "R2");
    }
}
