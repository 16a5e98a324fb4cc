// Pairwise route comparison across devices sharing a site

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::routes::{CanonicalCidr, DeviceRoutingTable};

/// Raw route text cited from each side of a pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawSides {
    pub a: Option<String>,
    pub b: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairComparison {
    pub device_a: String,
    pub device_b: String,
    pub matched: BTreeSet<CanonicalCidr>,
    pub only_a: BTreeSet<CanonicalCidr>,
    pub only_b: BTreeSet<CanonicalCidr>,
    pub raw_by_subnet: BTreeMap<CanonicalCidr, RawSides>,
}

impl PairComparison {
    pub fn is_consistent(&self) -> bool {
        self.only_a.is_empty() && self.only_b.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ComparisonResult {
    /// The site has a single device; its routes have no partner to compare against
    NoNeighbor {
        device_id: String,
        routes: BTreeMap<CanonicalCidr, String>,
    },
    Pair(PairComparison),
}

/// Compare two tables by exact subnet key. Never fails and never mutates its inputs.
pub fn compare_pair(a: &DeviceRoutingTable, b: &DeviceRoutingTable) -> PairComparison {
    let mut matched = BTreeSet::new();
    let mut only_a = BTreeSet::new();
    let mut only_b = BTreeSet::new();
    let mut raw_by_subnet = BTreeMap::new();

    for (subnet, route_a) in a.routes().iter() {
        let route_b = b.lookup(subnet);
        if route_b.is_some() {
            matched.insert(subnet.clone());
        } else {
            only_a.insert(subnet.clone());
        }
        raw_by_subnet.insert(
            subnet.clone(),
            RawSides {
                a: Some(route_a.raw_text.clone()),
                b: route_b.map(|route| route.raw_text.clone()),
            },
        );
    }

    for (subnet, route_b) in b.routes().iter() {
        if a.routes().contains(subnet) {
            continue;
        }
        only_b.insert(subnet.clone());
        raw_by_subnet.insert(
            subnet.clone(),
            RawSides {
                a: None,
                b: Some(route_b.raw_text.clone()),
            },
        );
    }

    PairComparison {
        device_a: a.device_id().to_string(),
        device_b: b.device_id().to_string(),
        matched,
        only_a,
        only_b,
        raw_by_subnet,
    }
}

/// Compare every unordered pair of devices at a site.
///
/// Zero devices give no results, one device gives a single `NoNeighbor`.
/// Pairs are produced in input order: (0,1), (0,2), ..., (1,2), ...
pub fn compare_site(tables: &[&DeviceRoutingTable]) -> Vec<ComparisonResult> {
    match tables {
        [] => Vec::new(),
        [only] => vec![ComparisonResult::NoNeighbor {
            device_id: only.device_id().to_string(),
            routes: only
                .routes()
                .iter()
                .map(|(subnet, route)| (subnet.clone(), route.raw_text.clone()))
                .collect(),
        }],
        _ => {
            let mut results = Vec::with_capacity(tables.len() * (tables.len() - 1) / 2);
            for (i, a) in tables.iter().enumerate() {
                for b in &tables[i + 1..] {
                    tracing::debug!("Comparing routes of {} and {}", a.device_id(), b.device_id());
                    results.push(ComparisonResult::Pair(compare_pair(a, b)));
                }
            }
            results
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_device_table;

    fn table(device_id: &str, output: &str) -> DeviceRoutingTable {
        build_device_table(device_id, output).unwrap()
    }

    fn set(subnets: &[&str]) -> BTreeSet<CanonicalCidr> {
        subnets.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compare_pair() {
        let r1 = table(
            "R1",
            "C 10.0.0.0/24 is directly connected, GigabitEthernet0/1\nS 0.0.0.0/0 [1/0] via 10.0.0.1\n",
        );
        let r2 = table(
            "R2",
            "C 10.0.0.0/24 is directly connected, GigabitEthernet0/2\n",
        );

        let result = compare_pair(&r1, &r2);

        assert_eq!(result.matched, set(&["10.0.0.0/24"]));
        assert_eq!(result.only_a, set(&["0.0.0.0/0"]));
        assert!(result.only_b.is_empty());
        assert!(!result.is_consistent());

        let matched_raw = &result.raw_by_subnet["10.0.0.0/24"];
        assert!(matched_raw.a.as_deref().unwrap().ends_with("GigabitEthernet0/1"));
        assert!(matched_raw.b.as_deref().unwrap().ends_with("GigabitEthernet0/2"));
        assert!(result.raw_by_subnet["0.0.0.0/0"].b.is_none());
    }

    #[test]
    fn test_compare_pair_is_symmetric() {
        let a = table(
            "A",
            "C 10.1.0.0/24 is directly connected, Gi0/0\nS 10.2.0.0/16 [1/0] via 10.1.0.1\nO 10.3.0.0/16 [110/2] via 10.1.0.2\n",
        );
        let b = table(
            "B",
            "C 10.1.0.0/24 is directly connected, Gi0/0\nO 10.3.0.0/16 [110/2] via 10.1.0.5\nO 10.4.0.0/16 [110/2] via 10.1.0.5\n",
        );

        let ab = compare_pair(&a, &b);
        let ba = compare_pair(&b, &a);

        assert_eq!(ab.matched, ba.matched);
        assert_eq!(ab.only_a, ba.only_b);
        assert_eq!(ab.only_b, ba.only_a);
        assert_eq!(ab.matched, set(&["10.1.0.0/24", "10.3.0.0/16"]));
    }

    #[test]
    fn test_overlapping_subnets_do_not_match() {
        let a = table("A", "S 10.0.0.0/8 [1/0] via 192.168.0.1\n");
        let b = table("B", "S 10.0.0.0/16 [1/0] via 192.168.0.1\n");

        let result = compare_pair(&a, &b);

        assert!(result.matched.is_empty());
        assert_eq!(result.only_a, set(&["10.0.0.0/8"]));
        assert_eq!(result.only_b, set(&["10.0.0.0/16"]));
    }

    #[test]
    fn test_compare_site_cardinality() {
        let a = table("A", "C 10.1.0.0/24 is directly connected, Gi0/0\n");
        let b = table("B", "C 10.1.0.0/24 is directly connected, Gi0/0\n");
        let c = table("C", "C 10.2.0.0/24 is directly connected, Gi0/0\n");

        assert!(compare_site(&[]).is_empty());

        let single = compare_site(&[&a]);
        assert_eq!(single.len(), 1);
        match &single[0] {
            ComparisonResult::NoNeighbor { device_id, routes } => {
                assert_eq!(device_id, "A");
                assert!(routes.contains_key("10.1.0.0/24"));
            }
            other => panic!("expected NoNeighbor, got {:?}", other),
        }

        let triple = compare_site(&[&a, &b, &c]);
        let pairs: Vec<(String, String)> = triple
            .iter()
            .map(|result| match result {
                ComparisonResult::Pair(pair) => (pair.device_a.clone(), pair.device_b.clone()),
                other => panic!("expected Pair, got {:?}", other),
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "B".to_string()),
                ("A".to_string(), "C".to_string()),
                ("B".to_string(), "C".to_string()),
            ]
        );
    }
}
