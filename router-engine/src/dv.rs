// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Distance-vector absorption and emission.
//!
//! A DV packet's header carries `src = advertising_router_id`, `dst =
//! entry_count`, `type = Dv`, `length = entry_count * 12`; its payload is
//! `entry_count` little-endian `(ip: u32, distance: i32, next_hop_id:
//! u32)` triples.

use crate::header::{Header, PacketType, HEADER_LEN};
use crate::route::{RouteEntry, RoutingTable, UNREACHABLE};
use tracing::{debug, trace};

/// Wire size, in bytes, of a single DV table entry.
pub const ENTRY_LEN: usize = 12;

/// A single `(ip, distance, next_hop_id)` advertisement, as carried in a DV
/// packet's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DvEntry {
    /// Advertised destination (host byte order).
    pub ip: u32,
    /// Advertised distance, or [`UNREACHABLE`] if poisoned.
    pub distance: i32,
    /// Id of the router relaying this advertisement (for split horizon).
    pub next_hop_id: u32,
}

impl DvEntry {
    fn read(bytes: &[u8]) -> Option<Self> {
        let ip = u32::from_le_bytes(bytes.get(0..4)?.try_into().ok()?);
        let distance = i32::from_le_bytes(bytes.get(4..8)?.try_into().ok()?);
        let next_hop_id = u32::from_le_bytes(bytes.get(8..12)?.try_into().ok()?);
        Some(Self {
            ip,
            distance,
            next_hop_id,
        })
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.ip.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.distance.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.next_hop_id.to_le_bytes());
    }
}

/// Parses the `entry_count` DV entries following the header in `buf`.
///
/// Returns `None` if `buf` is too short for the advertised entry count.
#[must_use]
pub fn parse_entries(buf: &[u8], entry_count: u32) -> Option<Vec<DvEntry>> {
    let mut entries = Vec::with_capacity(entry_count as usize);
    for i in 0..entry_count as usize {
        let start = HEADER_LEN + i * ENTRY_LEN;
        let chunk = buf.get(start..start + ENTRY_LEN)?;
        entries.push(DvEntry::read(chunk)?);
    }
    Some(entries)
}

/// Absorbs one received DV entry into `table`, applying split horizon,
/// poison propagation, and the standard DV "is this an improvement?"
/// comparison.
///
/// `self_id` is this router's own id (for split horizon); `in_port` is the
/// port the DV packet arrived on; `in_port_weight` is that port's link
/// weight; `advertising_id` is the `src` field of the DV packet (the
/// neighbor's router id). Returns whether the table changed.
pub fn absorb_entry(
    table: &mut RoutingTable,
    self_id: u32,
    in_port: u16,
    in_port_weight: i32,
    advertising_id: u32,
    entry: DvEntry,
) -> bool {
    if entry.next_hop_id == self_id {
        trace!(ip = entry.ip, "split horizon: ignoring our own route");
        return false;
    }

    if entry.distance == UNREACHABLE {
        return match table.get_mut(entry.ip) {
            Some(local) if local.port == in_port && !local.is_poisoned() => {
                local.poison();
                debug!(ip = entry.ip, "poisoned by advertiser");
                true
            }
            _ => false,
        };
    }

    let candidate_distance = entry.distance + in_port_weight;
    match table.get_mut(entry.ip) {
        None => {
            table.insert(
                entry.ip,
                RouteEntry::new(candidate_distance, in_port, advertising_id),
            );
            debug!(ip = entry.ip, distance = candidate_distance, "learned new route");
            true
        }
        Some(local) if local.is_poisoned() || candidate_distance < local.distance => {
            *local = RouteEntry::new(candidate_distance, in_port, advertising_id);
            debug!(ip = entry.ip, distance = candidate_distance, "improved route");
            true
        }
        Some(_) => false,
    }
}

/// Absorbs every entry in a received DV packet. Returns whether any entry
/// changed the table.
pub fn absorb_all(
    table: &mut RoutingTable,
    self_id: u32,
    in_port: u16,
    in_port_weight: i32,
    advertising_id: u32,
    entries: &[DvEntry],
) -> bool {
    let mut changed = false;
    for entry in entries {
        if absorb_entry(table, self_id, in_port, in_port_weight, advertising_id, *entry) {
            changed = true;
        }
    }
    changed
}

/// Serializes a DV packet advertising every entry in `table` into `buf`.
///
/// `buf` must be at least `HEADER_LEN + table.len() * ENTRY_LEN` bytes.
/// Returns `None` if it is not; on success, returns the total packet
/// length written.
pub fn emit(buf: &mut [u8], self_id: u32, table: &RoutingTable) -> Option<usize> {
    let entry_count = table.len();
    let payload_len = entry_count * ENTRY_LEN;
    let total_len = HEADER_LEN + payload_len;
    if buf.len() < total_len {
        return None;
    }
    Header::make_header(
        buf,
        self_id,
        u32::try_from(entry_count).ok()?,
        PacketType::Dv,
        u16::try_from(payload_len).ok()?,
    )?;
    for (i, (ip, route)) in table.iter().enumerate() {
        let start = HEADER_LEN + i * ENTRY_LEN;
        DvEntry {
            ip,
            distance: route.distance,
            next_hop_id: route.next_hop_id,
        }
        .write(&mut buf[start..start + ENTRY_LEN]);
    }
    Some(total_len)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_horizon_ignores_entries_from_self() {
        let mut table = RoutingTable::new();
        let entry = DvEntry {
            ip: 1,
            distance: 3,
            next_hop_id: 42,
        };
        let changed = absorb_entry(&mut table, 42, 2, 0, 7, entry);
        assert!(!changed);
        assert!(table.get(1).is_none());
    }

    #[test]
    fn learns_new_route_with_added_port_weight() {
        let mut table = RoutingTable::new();
        let entry = DvEntry {
            ip: 1,
            distance: 3,
            next_hop_id: 99,
        };
        assert!(absorb_entry(&mut table, 1, 2, 5, 7, entry));
        let route = table.get(1).expect("inserted");
        assert_eq!(route.distance, 8);
        assert_eq!(route.port, 2);
        assert_eq!(route.next_hop_id, 7);
    }

    #[test]
    fn ignores_strictly_worse_candidate() {
        let mut table = RoutingTable::new();
        table.insert(1, RouteEntry::new(2, 3, 7));
        let entry = DvEntry {
            ip: 1,
            distance: 10,
            next_hop_id: 99,
        };
        assert!(!absorb_entry(&mut table, 1, 2, 0, 7, entry));
        assert_eq!(table.get(1).expect("present").distance, 2);
    }

    #[test]
    fn replaces_poisoned_local_route_unconditionally() {
        let mut table = RoutingTable::new();
        table.insert(1, RouteEntry { distance: UNREACHABLE, port: 3, next_hop_id: 7 });
        let entry = DvEntry {
            ip: 1,
            distance: 50,
            next_hop_id: 99,
        };
        assert!(absorb_entry(&mut table, 1, 2, 0, 7, entry));
        assert_eq!(table.get(1).expect("present").distance, 50);
    }

    #[test]
    fn poison_entry_poisons_matching_local_route_via_same_port() {
        let mut table = RoutingTable::new();
        table.insert(1, RouteEntry::new(4, 2, 7));
        let entry = DvEntry {
            ip: 1,
            distance: UNREACHABLE,
            next_hop_id: 99,
        };
        assert!(absorb_entry(&mut table, 1, 2, 0, 7, entry));
        assert!(table.get(1).expect("present").is_poisoned());
    }

    #[test]
    fn poison_entry_does_not_affect_route_via_different_port() {
        let mut table = RoutingTable::new();
        table.insert(1, RouteEntry::new(4, 5, 7));
        let entry = DvEntry {
            ip: 1,
            distance: UNREACHABLE,
            next_hop_id: 99,
        };
        assert!(!absorb_entry(&mut table, 1, 2, 0, 7, entry));
        assert!(!table.get(1).expect("present").is_poisoned());
    }

    #[test]
    fn emit_then_parse_round_trips_table_contents() {
        let mut table = RoutingTable::new();
        table.insert(10, RouteEntry::new(3, 1, 5));
        table.insert(20, RouteEntry::new(UNREACHABLE, 2, 6));

        let mut buf = vec![0u8; HEADER_LEN + table.len() * ENTRY_LEN];
        let written = emit(&mut buf, 1, &table).expect("buffer big enough");
        assert_eq!(written, buf.len());
        assert_eq!(Header::src(&buf), Some(1));
        assert_eq!(Header::dst(&buf), Some(2));
        assert_eq!(Header::packet_type(&buf), Some(PacketType::Dv));

        let entries = parse_entries(&buf, 2).expect("well formed");
        let mut by_ip: Vec<_> = entries.into_iter().map(|e| (e.ip, e.distance, e.next_hop_id)).collect();
        by_ip.sort_by_key(|(ip, _, _)| *ip);
        assert_eq!(by_ip, vec![(10, 3, 5), (20, UNREACHABLE, 6)]);
    }
}
