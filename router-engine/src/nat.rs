// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bijective NAT maps and the bounded external-address pool they draw
//! from.
//!
//! A single internal source gets at most one external address, allocated
//! lazily on its first packet out the external port and held until
//! explicitly released via control verb `'1'`. The pool is an unordered
//! LIFO: allocation pops, release pushes back.

use ahash::AHashMap;

/// Bijective forward/reverse NAT bindings plus the pool of addresses not
/// currently bound to anything.
#[derive(Debug, Default, Clone)]
pub struct NatTable {
    forward: AHashMap<u32, u32>,
    reverse: AHashMap<u32, u32>,
    available: Vec<u32>,
}

impl NatTable {
    /// Creates an empty NAT table with no addresses available yet. Use
    /// [`NatTable::fill_pool`] to seed the available pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `addr` onto the available pool. Used at `init` time to seed
    /// the pool from the configured CIDR.
    pub fn fill_pool(&mut self, addr: u32) {
        self.available.push(addr);
    }

    /// Looks up the external address currently bound to internal source
    /// `internal`, if any, without allocating.
    #[must_use]
    pub fn forward_lookup(&self, internal: u32) -> Option<u32> {
        self.forward.get(&internal).copied()
    }

    /// Looks up the internal source bound to external address `external`,
    /// if any.
    #[must_use]
    pub fn reverse_lookup(&self, external: u32) -> Option<u32> {
        self.reverse.get(&external).copied()
    }

    /// Returns the external address bound to `internal`, allocating one
    /// from the pool if no binding exists yet.
    ///
    /// Returns `None` if `internal` has no binding and the pool is empty.
    pub fn allocate(&mut self, internal: u32) -> Option<u32> {
        if let Some(existing) = self.forward.get(&internal) {
            return Some(*existing);
        }
        let external = self.available.pop()?;
        self.forward.insert(internal, external);
        self.reverse.insert(external, internal);
        Some(external)
    }

    /// Releases the binding for internal source `internal`, if one
    /// exists, returning its external address to the pool.
    ///
    /// Returns whether a binding was found and released.
    pub fn release(&mut self, internal: u32) -> bool {
        let Some(external) = self.forward.remove(&internal) else {
            return false;
        };
        self.reverse.remove(&external);
        self.available.push(external);
        true
    }

    /// Number of addresses currently sitting unbound in the pool.
    #[must_use]
    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    /// Number of active bindings.
    #[must_use]
    pub fn bound_len(&self) -> usize {
        self.forward.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pool(addrs: &[u32]) -> NatTable {
        let mut table = NatTable::new();
        for &a in addrs {
            table.fill_pool(a);
        }
        table
    }

    #[test]
    fn allocate_pops_and_binds_both_directions() {
        let mut table = pool(&[1, 2, 3]);
        let external = table.allocate(100).expect("pool non-empty");
        assert_eq!(external, 3, "LIFO: last pushed is first popped");
        assert_eq!(table.forward_lookup(100), Some(3));
        assert_eq!(table.reverse_lookup(3), Some(100));
    }

    #[test]
    fn repeated_allocate_from_same_source_reuses_binding() {
        let mut table = pool(&[1, 2, 3]);
        let first = table.allocate(100).expect("pool non-empty");
        let second = table.allocate(100).expect("existing binding");
        assert_eq!(first, second);
        assert_eq!(table.available_len(), 2);
    }

    #[test]
    fn allocate_on_empty_pool_returns_none() {
        let mut table = NatTable::new();
        assert_eq!(table.allocate(100), None);
    }

    #[test]
    fn release_returns_address_to_pool_and_breaks_both_directions() {
        let mut table = pool(&[1]);
        let external = table.allocate(100).expect("pool non-empty");
        assert!(table.release(100));
        assert_eq!(table.forward_lookup(100), None);
        assert_eq!(table.reverse_lookup(external), None);
        assert_eq!(table.available_len(), 1);
    }

    #[test]
    fn release_of_unbound_source_is_a_no_op() {
        let mut table = pool(&[1]);
        assert!(!table.release(999));
        assert_eq!(table.available_len(), 1);
    }

    #[test]
    fn pool_plus_bound_count_is_conserved() {
        let mut table = pool(&[1, 2, 3, 4]);
        let total = table.available_len() + table.bound_len();
        table.allocate(100);
        table.allocate(200);
        assert_eq!(table.available_len() + table.bound_len(), total);
        table.release(100);
        assert_eq!(table.available_len() + table.bound_len(), total);
    }
}
