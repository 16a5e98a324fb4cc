// Subnet index - exact-match store of route entries keyed by canonical subnet
//
// Lookups compare the full `A.B.C.D/len` key only. Overlapping but unequal
// subnets are different keys.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{CanonicalCidr, RouteEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubnetIndex {
    entries: BTreeMap<CanonicalCidr, RouteEntry>,
}

impl SubnetIndex {
    pub fn new() -> Self {
        SubnetIndex {
            entries: BTreeMap::new(),
        }
    }

    /// Store an entry, replacing any entry already held under the same key.
    /// Returns the replaced entry.
    pub fn insert(&mut self, subnet: CanonicalCidr, entry: RouteEntry) -> Option<RouteEntry> {
        self.entries.insert(subnet, entry)
    }

    pub fn lookup(&self, subnet: &str) -> Option<&RouteEntry> {
        self.entries.get(subnet)
    }

    pub fn contains(&self, subnet: &str) -> bool {
        self.entries.contains_key(subnet)
    }

    /// Subnet keys in sorted order
    pub fn subnets(&self) -> impl Iterator<Item = &CanonicalCidr> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalCidr, &RouteEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RouteEntry> for SubnetIndex {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        let mut index = SubnetIndex::new();
        for entry in iter {
            index.insert(entry.subnet.clone(), entry);
        }
        index
    }
}
