// OSPF default-information-originate metric cross-check
//
// A site policy evaluated next to the comparator for each device pair. The
// comparator itself knows nothing about metrics.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Debug;

pub const DEFAULT_ALLOWED_METRICS: [u32; 2] = [110, 120];

/// A swappable rule over the metric values advertised by a device pair
pub trait MetricPolicy: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Both slices are already normalized and never empty
    fn is_compliant(&self, metrics_a: &[u32], metrics_b: &[u32]) -> bool;
}

/// Passes when every metric on both devices is in the allowed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMetricSet {
    allowed: BTreeSet<u32>,
}

impl AllowedMetricSet {
    pub fn new(allowed: impl IntoIterator<Item = u32>) -> Self {
        AllowedMetricSet {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn allowed(&self) -> &BTreeSet<u32> {
        &self.allowed
    }
}

impl Default for AllowedMetricSet {
    fn default() -> Self {
        AllowedMetricSet::new(DEFAULT_ALLOWED_METRICS)
    }
}

impl MetricPolicy for AllowedMetricSet {
    fn name(&self) -> &str {
        "ospf-default-metric-allowed-set"
    }

    fn is_compliant(&self, metrics_a: &[u32], metrics_b: &[u32]) -> bool {
        metrics_a
            .iter()
            .chain(metrics_b)
            .all(|metric| self.allowed.contains(metric))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCheck {
    pub policy: String,
    pub metrics_a: Vec<u32>,
    pub metrics_b: Vec<u32>,
    pub compliant: bool,
}

/// Missing or unparseable metrics count as `0`
pub fn normalize_metrics(raw: &[String]) -> Vec<u32> {
    if raw.is_empty() {
        return vec![0];
    }
    raw.iter()
        .map(|value| value.trim().parse().unwrap_or(0))
        .collect()
}

/// Run `policy` for a pair. Returns `None` unless both devices were scanned
/// for the directive.
pub fn check_pair(
    policy: &dyn MetricPolicy,
    raw_a: Option<&[String]>,
    raw_b: Option<&[String]>,
) -> Option<MetricCheck> {
    let (raw_a, raw_b) = (raw_a?, raw_b?);
    let metrics_a = normalize_metrics(raw_a);
    let metrics_b = normalize_metrics(raw_b);
    let compliant = policy.is_compliant(&metrics_a, &metrics_b);

    Some(MetricCheck {
        policy: policy.name().to_string(),
        metrics_a,
        metrics_b,
        compliant,
    })
}
