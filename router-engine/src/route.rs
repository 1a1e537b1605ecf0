// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The routing table and its entries.

use ahash::AHashMap;

/// Distance value meaning "unreachable" / poisoned.
pub const UNREACHABLE: i32 = -1;

/// A single routing-table entry.
///
/// `distance == `[`UNREACHABLE`] encodes a poisoned/unreachable route; any
/// non-negative value is additive hop-weight. `next_hop_id` is the id of
/// the router that advertised this route, used for split-horizon loop
/// avoidance during DV absorption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// Hop-weight, or [`UNREACHABLE`].
    pub distance: i32,
    /// Local egress port for this route.
    pub port: u16,
    /// Id of the router that advertised this route.
    pub next_hop_id: u32,
}

impl RouteEntry {
    /// Creates a new, non-poisoned route entry.
    #[must_use]
    pub fn new(distance: i32, port: u16, next_hop_id: u32) -> Self {
        Self {
            distance,
            port,
            next_hop_id,
        }
    }

    /// Whether this entry is poisoned (unreachable).
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.distance == UNREACHABLE
    }

    /// Marks this entry poisoned in place.
    pub fn poison(&mut self) {
        self.distance = UNREACHABLE;
    }
}

/// Maps a host-byte-order IPv4 address to the route that reaches it.
///
/// This covers both internal hosts registered via the `add_host` control
/// verb and every address in the configured external range(s), which are
/// enumerated into individual entries at `init` time.
#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    entries: AHashMap<u32, RouteEntry>,
}

impl RoutingTable {
    /// Creates an empty routing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the route to `ip`, if any.
    #[must_use]
    pub fn get(&self, ip: u32) -> Option<&RouteEntry> {
        self.entries.get(&ip)
    }

    /// Looks up the route to `ip` mutably, if any.
    pub fn get_mut(&mut self, ip: u32) -> Option<&mut RouteEntry> {
        self.entries.get_mut(&ip)
    }

    /// Inserts or replaces the route to `ip`.
    pub fn insert(&mut self, ip: u32, entry: RouteEntry) {
        self.entries.insert(ip, entry);
    }

    /// Number of entries currently in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates all `(ip, entry)` pairs currently in the table.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &RouteEntry)> {
        self.entries.iter().map(|(ip, entry)| (*ip, entry))
    }

    /// Poisons every entry routed via `port`, returning whether any entry
    /// was changed.
    pub fn poison_port(&mut self, port: u16) -> bool {
        let mut changed = false;
        for entry in self.entries.values_mut() {
            if entry.port == port && !entry.is_poisoned() {
                entry.poison();
                changed = true;
            }
        }
        changed
    }

    /// Adds `delta` to the distance of every non-poisoned entry routed via
    /// `port`.
    pub fn adjust_port_distance(&mut self, port: u16, delta: i32) {
        for entry in self.entries.values_mut() {
            if entry.port == port && !entry.is_poisoned() {
                entry.distance += delta;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn poison_port_marks_matching_entries_and_reports_change() {
        let mut table = RoutingTable::new();
        table.insert(1, RouteEntry::new(3, 2, 7));
        table.insert(2, RouteEntry::new(4, 5, 7));
        assert!(table.poison_port(2));
        assert!(table.get(1).expect("present").is_poisoned());
        assert!(!table.get(2).expect("present").is_poisoned());
        // Re-poisoning the same port with nothing left to change reports no change.
        assert!(!table.poison_port(2));
    }

    #[test]
    fn adjust_port_distance_skips_poisoned_entries() {
        let mut table = RoutingTable::new();
        table.insert(1, RouteEntry::new(3, 2, 7));
        table.insert(2, RouteEntry { distance: UNREACHABLE, port: 2, next_hop_id: 7 });
        table.adjust_port_distance(2, 5);
        assert_eq!(table.get(1).expect("present").distance, 8);
        assert_eq!(table.get(2).expect("present").distance, UNREACHABLE);
    }
}
