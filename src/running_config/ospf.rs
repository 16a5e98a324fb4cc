// OSPF details pulled from a device's running-config
//
// Default-information-originate metrics feed the metric cross-check; the
// `network` statements and interface-level `ip ospf <pid> area <id>` lines
// say which local interfaces OSPF advertises.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use super::{BlockKind, BlockSegmenter};
use crate::routes::CanonicalCidr;
use crate::routes::lookup::matches_cidr;
use crate::routes::netmask::wildcard_to_prefix_length;

static DIO_METRIC_REGEX: OnceLock<Regex> = OnceLock::new();
static NETWORK_REGEX: OnceLock<Regex> = OnceLock::new();
static INTERFACE_AREA_REGEX: OnceLock<Regex> = OnceLock::new();

fn dio_metric_regex() -> &'static Regex {
    DIO_METRIC_REGEX.get_or_init(|| {
        Regex::new(r"default-information originate metric (\d+) metric-type 1")
            .expect("Invalid Regex")
    })
}

fn network_regex() -> &'static Regex {
    NETWORK_REGEX.get_or_init(|| {
        Regex::new(r"^\s*network\s+(?P<address>\d{1,3}(?:\.\d{1,3}){3})\s+(?P<wildcard>\d{1,3}(?:\.\d{1,3}){3})\s+area\s+\S+")
            .expect("Invalid Regex")
    })
}

fn interface_area_regex() -> &'static Regex {
    INTERFACE_AREA_REGEX.get_or_init(|| {
        Regex::new(r"^\s*ip ospf\s+\d+\s+area\s+\S+").expect("Invalid Regex")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OspfConfig {
    /// Metrics of every `default-information originate metric <n> metric-type 1`,
    /// in the order they appear
    pub default_originate_metrics: Vec<String>,
    /// Subnets named by `network <address> <wildcard> area <id>`
    pub networks: Vec<CanonicalCidr>,
    /// Interfaces enabled directly with `ip ospf <pid> area <id>`
    pub interfaces: BTreeSet<String>,
}

impl OspfConfig {
    /// Scan `router ospf` and `interface` blocks of a running-config
    pub fn from_running_config(config: &str) -> Self {
        let mut ospf = OspfConfig::default();

        for block in BlockSegmenter::new([BlockKind::Interface, BlockKind::Router]).segment(config) {
            match block.kind {
                BlockKind::Router if block.header.starts_with("router ospf") => {
                    for line in &block.lines {
                        if let Some(caps) = dio_metric_regex().captures(line) {
                            ospf.default_originate_metrics.push(caps[1].to_string());
                        }
                        if let Some(caps) = network_regex().captures(line) {
                            let suffix = wildcard_to_prefix_length(&caps["wildcard"]);
                            if suffix.is_empty() {
                                tracing::debug!(
                                    "Skipping OSPF network with wildcard {}",
                                    &caps["wildcard"]
                                );
                                continue;
                            }
                            ospf.networks.push(format!("{}{}", &caps["address"], suffix));
                        }
                    }
                }
                BlockKind::Interface => {
                    let enabled = block.lines.iter().any(|line| interface_area_regex().is_match(line));
                    if let (true, Some(name)) = (enabled, block.header.split_whitespace().nth(1)) {
                        ospf.interfaces.insert(name.to_string());
                    }
                }
                _ => {}
            }
        }

        ospf
    }

    /// Whether OSPF advertises the interface `interface` with address `address`
    pub fn covers(&self, interface: &str, address: Ipv4Addr) -> bool {
        self.interfaces.contains(interface)
            || self
                .networks
                .iter()
                .any(|network| matches_cidr(network, address).is_some())
    }
}
