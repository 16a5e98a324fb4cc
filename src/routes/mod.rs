// Routes module - route records, the text extractor and per-device tables

pub mod index;
pub mod lookup;
pub mod netmask;
pub mod parser;
pub mod table;

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub use index::SubnetIndex;
pub use lookup::{GlobalInterfaceIndex, InterfaceOwner};
pub use parser::{ExtractedRoutes, ParseWarning, extract_routes};
pub use table::{DeviceRoutingTable, build_device_table};

/// Normalized `A.B.C.D/len` subnet key
pub type CanonicalCidr = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Local,
    Connected,
    Static,
    Dynamic,
}

impl RouteKind {
    /// Classify a route code from a header line (`S*`, `O E2`, `D EX`, `B`...)
    pub fn from_code(code: &str) -> Self {
        match code.trim_start().chars().next() {
            Some('L') if code.trim() == "L" => RouteKind::Local,
            Some('C') if code.trim() == "C" => RouteKind::Connected,
            Some('S') => RouteKind::Static,
            _ => RouteKind::Dynamic,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, RouteKind::Local | RouteKind::Connected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub subnet: CanonicalCidr,
    pub kind: RouteKind,
    pub next_hops: Vec<Ipv4Addr>,
    pub interface: Option<String>,
    pub raw_text: String,
}

impl RouteEntry {
    /// Entry for a directly attached subnet
    pub fn attached(
        subnet: CanonicalCidr,
        kind: RouteKind,
        interface: String,
        raw_text: String,
    ) -> Self {
        RouteEntry {
            subnet,
            kind,
            next_hops: Vec::new(),
            interface: Some(interface),
            raw_text,
        }
    }

    /// Entry for a static or protocol-learned subnet
    pub fn via(
        subnet: CanonicalCidr,
        kind: RouteKind,
        next_hops: Vec<Ipv4Addr>,
        raw_text: String,
    ) -> Self {
        RouteEntry {
            subnet,
            kind,
            next_hops,
            interface: None,
            raw_text,
        }
    }

    /// Local/Connected entries carry an interface and no next hop;
    /// Static/Dynamic entries carry at least one next hop.
    pub fn is_well_formed(&self) -> bool {
        if self.kind.is_attached() {
            self.interface.as_deref().is_some_and(|i| !i.is_empty()) && self.next_hops.is_empty()
        } else {
            !self.next_hops.is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_kind_from_code() {
        assert_eq!(RouteKind::from_code("L"), RouteKind::Local);
        assert_eq!(RouteKind::from_code("C"), RouteKind::Connected);
        assert_eq!(RouteKind::from_code("S"), RouteKind::Static);
        assert_eq!(RouteKind::from_code("S*"), RouteKind::Static);
        assert_eq!(RouteKind::from_code("O E2"), RouteKind::Dynamic);
        assert_eq!(RouteKind::from_code("D EX"), RouteKind::Dynamic);
        assert_eq!(RouteKind::from_code("B"), RouteKind::Dynamic);
        assert_eq!(RouteKind::from_code("i L2"), RouteKind::Dynamic);
    }

    #[test]
    fn test_well_formed_entries() {
        let connected = RouteEntry::attached(
            "10.0.0.0/24".to_string(),
            RouteKind::Connected,
            "Gi0/1".to_string(),
            String::new(),
        );
        assert!(connected.is_well_formed());

        let no_hops = RouteEntry::via(
            "0.0.0.0/0".to_string(),
            RouteKind::Static,
            Vec::new(),
            String::new(),
        );
        assert!(!no_hops.is_well_formed());
    }
}
