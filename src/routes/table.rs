// Per-device routing table builder

use serde::Serialize;

use super::parser::{ParseWarning, extract_routes};
use super::{CanonicalCidr, RouteEntry, RouteKind, SubnetIndex};
use crate::error::{AuditError, AuditResult};

/// One device's parsed routing table. Built once per audit run and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRoutingTable {
    device_id: String,
    routes: SubnetIndex,
    local_interfaces: Vec<(String, CanonicalCidr)>,
    warnings: Vec<ParseWarning>,
}

impl DeviceRoutingTable {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn routes(&self) -> &SubnetIndex {
        &self.routes
    }

    pub fn lookup(&self, subnet: &str) -> Option<&RouteEntry> {
        self.routes.lookup(subnet)
    }

    /// `(interface, subnet)` pairs of the device's Local routes, in the order seen
    pub fn local_interfaces(&self) -> &[(String, CanonicalCidr)] {
        &self.local_interfaces
    }

    /// Entries dropped or degraded while parsing this device
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }
}

/// Parse one device's route output into a table.
///
/// Output with no recognisable route line at all is reported as
/// [`AuditError::Unparseable`], which is not the same as a table with no routes.
pub fn build_device_table(device_id: &str, raw_text: &str) -> AuditResult<DeviceRoutingTable> {
    let extracted = extract_routes(raw_text).map_err(|_| {
        tracing::warn!("No routing table entries found for {}", device_id);
        AuditError::Unparseable {
            device_id: device_id.to_string(),
        }
    })?;

    let local_interfaces = extracted
        .routes
        .iter()
        .filter(|route| route.kind == RouteKind::Local)
        .filter_map(|route| {
            route
                .interface
                .as_ref()
                .map(|iface| (iface.clone(), route.subnet.clone()))
        })
        .collect();

    let route_count = extracted.routes.len();
    let routes: SubnetIndex = extracted.routes.into_iter().collect();
    if routes.len() < route_count {
        tracing::debug!(
            "{}: {} duplicate subnet(s) replaced by later entries",
            device_id,
            route_count - routes.len()
        );
    }

    for warning in &extracted.warnings {
        tracing::warn!("{}: {}", device_id, warning);
    }

    tracing::info!(
        "Parsed {} routes for {} ({} warnings)",
        routes.len(),
        device_id,
        extracted.warnings.len()
    );

    Ok(DeviceRoutingTable {
        device_id: device_id.to_string(),
        routes,
        local_interfaces,
        warnings: extracted.warnings,
    })
}
