// Audit module - per-run context grouping device tables by site

pub mod compare;
pub mod metric;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::Ipv4Addr;
use uuid::Uuid;

use crate::error::AuditResult;
use crate::routes::{DeviceRoutingTable, GlobalInterfaceIndex, build_device_table};
use crate::running_config::ospf::OspfConfig;
use compare::{ComparisonResult, compare_site};
use metric::{AllowedMetricSet, MetricCheck, MetricPolicy, check_pair};

/// A group of devices sharing a work location
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteKey {
    pub country: String,
    pub site: String,
}

impl SiteKey {
    pub fn new(country: impl Into<String>, site: impl Into<String>) -> Self {
        SiteKey {
            country: country.into(),
            site: site.into(),
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.country, self.site)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnparseableDevice {
    pub device_id: String,
    pub site: SiteKey,
    pub reason: String,
}

/// One comparison result plus the metric policy verdict for the same pair
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    #[serde(flatten)]
    pub result: ComparisonResult,
    pub metric_check: Option<MetricCheck>,
}

/// Whether OSPF advertises one local interface of an audited device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceCoverage {
    pub device_id: String,
    pub interface: String,
    pub subnet: String,
    /// `None` when the device's running-config was not available
    pub in_ospf: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub site: SiteKey,
    pub findings: Vec<Finding>,
}

/// State of a single audit run.
///
/// Every table, the interface index and the metric annotations live here
/// for the duration of one run and are rebuilt from raw text on the next.
#[derive(Debug)]
pub struct AuditRun {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    tables: HashMap<String, DeviceRoutingTable>,
    sites: BTreeMap<SiteKey, Vec<String>>,
    unparseable: Vec<UnparseableDevice>,
    ospf: HashMap<String, OspfConfig>,
    interfaces: GlobalInterfaceIndex,
    policy: Box<dyn MetricPolicy>,
}

impl AuditRun {
    pub fn new(policy: Box<dyn MetricPolicy>) -> Self {
        AuditRun {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            tables: HashMap::new(),
            sites: BTreeMap::new(),
            unparseable: Vec::new(),
            ospf: HashMap::new(),
            interfaces: GlobalInterfaceIndex::new(),
            policy,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Parse a device's route output and record it under `site`
    pub fn ingest(&mut self, site: SiteKey, device_id: &str, raw_text: &str) -> bool {
        let outcome = build_device_table(device_id, raw_text);
        self.record(site, device_id, outcome)
    }

    /// Record the outcome of building one device's table.
    ///
    /// Unparseable devices are kept aside and never take part in comparisons.
    /// Recording a device again replaces everything recorded for it before,
    /// including its site. Returns whether the device was added to its site.
    pub fn record(
        &mut self,
        site: SiteKey,
        device_id: &str,
        outcome: AuditResult<DeviceRoutingTable>,
    ) -> bool {
        if self.forget(device_id) {
            tracing::warn!("Device {} recorded twice, keeping the later outcome", device_id);
        }

        match outcome {
            Ok(table) => {
                self.interfaces.register_table(&table);
                self.sites
                    .entry(site)
                    .or_default()
                    .push(device_id.to_string());
                self.tables.insert(device_id.to_string(), table);
                true
            }
            Err(err) => {
                if !err.is_device_local() {
                    tracing::error!("Unexpected failure for {}: {}", device_id, err);
                }
                tracing::warn!("Excluding {} at {} from comparison: {}", device_id, site, err);
                self.unparseable.push(UnparseableDevice {
                    device_id: device_id.to_string(),
                    site,
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    /// Remove the table, site membership, OSPF settings, interfaces and
    /// unparseable entry of a device. Returns whether anything had been recorded for it.
    fn forget(&mut self, device_id: &str) -> bool {
        let had_table = self.tables.remove(device_id).is_some();
        self.ospf.remove(device_id);
        self.interfaces.remove_device(device_id);
        self.sites
            .values_mut()
            .for_each(|members| members.retain(|member| member != device_id));
        self.sites.retain(|_, members| !members.is_empty());

        let before = self.unparseable.len();
        self.unparseable.retain(|device| device.device_id != device_id);
        had_table || self.unparseable.len() != before
    }

    /// Attach the OSPF settings scanned from a device's running-config
    pub fn set_ospf_config(&mut self, device_id: &str, ospf: OspfConfig) {
        self.ospf.insert(device_id.to_string(), ospf);
    }

    /// Attach only the OSPF default-originate metrics of a device
    pub fn set_ospf_metrics(&mut self, device_id: &str, metrics: Vec<String>) {
        self.ospf
            .entry(device_id.to_string())
            .or_default()
            .default_originate_metrics = metrics;
    }

    pub fn ospf_config(&self, device_id: &str) -> Option<&OspfConfig> {
        self.ospf.get(device_id)
    }

    pub fn ospf_metrics(&self, device_id: &str) -> Option<&[String]> {
        self.ospf
            .get(device_id)
            .map(|ospf| ospf.default_originate_metrics.as_slice())
    }

    pub fn table(&self, device_id: &str) -> Option<&DeviceRoutingTable> {
        self.tables.get(device_id)
    }

    pub fn interfaces(&self) -> &GlobalInterfaceIndex {
        &self.interfaces
    }

    pub fn unparseable(&self) -> &[UnparseableDevice] {
        &self.unparseable
    }

    pub fn policy(&self) -> &dyn MetricPolicy {
        self.policy.as_ref()
    }

    /// Sites in sorted order with their parseable devices in recording order
    pub fn sites(&self) -> impl Iterator<Item = (&SiteKey, Vec<&DeviceRoutingTable>)> {
        self.sites.iter().map(|(site, members)| {
            let tables = members
                .iter()
                .filter_map(|device_id| self.tables.get(device_id))
                .collect();
            (site, tables)
        })
    }

    /// OSPF coverage of every local interface, by site then recording order
    pub fn interface_coverage(&self) -> Vec<InterfaceCoverage> {
        self.sites()
            .flat_map(|(_, tables)| tables)
            .flat_map(|table| {
                let ospf = self.ospf_config(table.device_id());
                table
                    .local_interfaces()
                    .iter()
                    .map(move |(interface, subnet)| {
                        let address = subnet
                            .split('/')
                            .next()
                            .and_then(|address| address.parse::<Ipv4Addr>().ok());
                        let in_ospf = match (ospf, address) {
                            (Some(ospf), Some(address)) => Some(ospf.covers(interface, address)),
                            _ => None,
                        };
                        InterfaceCoverage {
                            device_id: table.device_id().to_string(),
                            interface: interface.clone(),
                            subnet: subnet.clone(),
                            in_ospf,
                        }
                    })
            })
            .collect()
    }

    /// Compare every pair of devices within each site
    pub fn compare_sites(&self) -> Vec<SiteReport> {
        self.sites()
            .map(|(site, tables)| {
                let findings = compare_site(&tables)
                    .into_iter()
                    .map(|result| {
                        let metric_check = match &result {
                            ComparisonResult::Pair(pair) => check_pair(
                                self.policy(),
                                self.ospf_metrics(&pair.device_a),
                                self.ospf_metrics(&pair.device_b),
                            ),
                            ComparisonResult::NoNeighbor { .. } => None,
                        };
                        Finding {
                            result,
                            metric_check,
                        }
                    })
                    .collect::<Vec<_>>();

                tracing::info!(
                    "Site {}: {} device(s), {} finding(s)",
                    site,
                    tables.len(),
                    findings.len()
                );

                SiteReport {
                    site: site.clone(),
                    findings,
                }
            })
            .collect()
    }
}

impl Default for AuditRun {
    fn default() -> Self {
        AuditRun::new(Box::new(AllowedMetricSet::default()))
    }
}
