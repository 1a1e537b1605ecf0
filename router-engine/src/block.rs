// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The set of source addresses whose traffic is silently dropped.

use ahash::AHashSet;

/// A set of blocked source addresses (host byte order).
#[derive(Debug, Default, Clone)]
pub struct BlockSet {
    blocked: AHashSet<u32>,
}

impl BlockSet {
    /// Creates an empty block set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `addr` to the block set.
    pub fn block(&mut self, addr: u32) {
        self.blocked.insert(addr);
    }

    /// Removes `addr` from the block set, if present.
    pub fn unblock(&mut self, addr: u32) {
        self.blocked.remove(&addr);
    }

    /// Whether `addr` is currently blocked.
    #[must_use]
    pub fn is_blocked(&self, addr: u32) -> bool {
        self.blocked.contains(&addr)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn block_then_unblock_round_trips() {
        let mut set = BlockSet::new();
        assert!(!set.is_blocked(1));
        set.block(1);
        assert!(set.is_blocked(1));
        set.unblock(1);
        assert!(!set.is_blocked(1));
    }

    #[test]
    fn unblocking_an_address_never_blocked_is_a_no_op() {
        let mut set = BlockSet::new();
        set.unblock(1);
        assert!(!set.is_blocked(1));
    }
}
