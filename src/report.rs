// Audit report assembly and output
//
// The report carries the full per-site findings plus one flat summary row
// per comparison, in the same order the comparisons were produced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use uuid::Uuid;

use crate::audit::compare::ComparisonResult;
use crate::audit::{AuditRun, InterfaceCoverage, SiteReport, UnparseableDevice};
use crate::error::AuditResult;

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub policy: String,
    pub unparseable: Vec<UnparseableDevice>,
    pub summary: Vec<SummaryRow>,
    pub interfaces: Vec<InterfaceCoverage>,
    pub sites: Vec<SiteReport>,
}

/// One line of the audit overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub country: String,
    pub site: String,
    pub device: String,
    pub neighbor: Option<String>,
    pub has_matches: bool,
    pub only_in_device: usize,
    pub only_in_neighbor: usize,
    pub metrics_device: Option<Vec<u32>>,
    pub metrics_neighbor: Option<Vec<u32>>,
    /// `None` when the metric check did not run for this row
    pub metrics_standard: Option<bool>,
    /// Other devices owning an interface subnet this device routes to
    pub adjacent_devices: BTreeSet<String>,
}

impl AuditReport {
    pub fn build(run: &AuditRun, sites: Vec<SiteReport>) -> Self {
        let mut summary = Vec::new();

        for report in &sites {
            for finding in &report.findings {
                let check = finding.metric_check.as_ref();
                let row = match &finding.result {
                    ComparisonResult::NoNeighbor { device_id, .. } => SummaryRow {
                        country: report.site.country.clone(),
                        site: report.site.site.clone(),
                        device: device_id.clone(),
                        neighbor: None,
                        has_matches: false,
                        only_in_device: 0,
                        only_in_neighbor: 0,
                        metrics_device: None,
                        metrics_neighbor: None,
                        metrics_standard: None,
                        adjacent_devices: adjacent_devices(run, device_id),
                    },
                    ComparisonResult::Pair(pair) => SummaryRow {
                        country: report.site.country.clone(),
                        site: report.site.site.clone(),
                        device: pair.device_a.clone(),
                        neighbor: Some(pair.device_b.clone()),
                        has_matches: !pair.matched.is_empty(),
                        only_in_device: pair.only_a.len(),
                        only_in_neighbor: pair.only_b.len(),
                        metrics_device: check.map(|c| c.metrics_a.clone()),
                        metrics_neighbor: check.map(|c| c.metrics_b.clone()),
                        metrics_standard: check.map(|c| c.compliant),
                        adjacent_devices: adjacent_devices(run, &pair.device_a),
                    },
                };
                summary.push(row);
            }
        }

        AuditReport {
            run_id: run.run_id(),
            started_at: run.started_at(),
            policy: run.policy().name().to_string(),
            unparseable: run.unparseable().to_vec(),
            summary,
            interfaces: run.interface_coverage(),
            sites,
        }
    }

    pub fn to_json(&self, pretty: bool) -> AuditResult<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub async fn write_json(&self, path: &Path, pretty: bool) -> AuditResult<()> {
        let json = self.to_json(pretty)?;
        tokio::fs::write(path, json).await?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }

    /// Log one line per summary row
    pub fn log_summary(&self) {
        for row in &self.summary {
            let neighbor = row.neighbor.as_deref().unwrap_or("-");
            let standard = match row.metrics_standard {
                Some(true) => "yes",
                Some(false) => "NO",
                None => "n/a",
            };
            tracing::info!(
                "{}/{} {} <-> {}: matches={} only_device={} only_neighbor={} metrics_standard={}",
                row.country,
                row.site,
                row.device,
                neighbor,
                row.has_matches,
                row.only_in_device,
                row.only_in_neighbor,
                standard
            );
        }
        for coverage in &self.interfaces {
            if coverage.in_ospf == Some(false) {
                tracing::info!(
                    "{} {} ({}) is not advertised by OSPF",
                    coverage.device_id,
                    coverage.interface,
                    coverage.subnet
                );
            }
        }
        for device in &self.unparseable {
            tracing::warn!("{} at {} not audited: {}", device.device_id, device.site, device.reason);
        }
    }
}

fn adjacent_devices(run: &AuditRun, device_id: &str) -> BTreeSet<String> {
    run.table(device_id)
        .map(|table| run.interfaces().adjacent_devices(table))
        .unwrap_or_default()
}
