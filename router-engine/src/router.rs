// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The `Router`: the engine's single stateful object, and its two entry
//! points `init`/`handle`.
//!
//! `handle` is the packet-processing hot path. It never allocates beyond
//! what `dv::emit`/`control::apply` already need, and never panics on
//! well-formed-but-unroutable input -- only a truncated header ever yields
//! an early `-1`.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, trace, warn};

use crate::addr::Cidr;
use crate::block::BlockSet;
use crate::control::{self, Outcome};
use crate::dv;
use crate::error::EngineError;
use crate::header::{Header, PacketType, HEADER_LEN};
use crate::nat::NatTable;
use crate::ports::PortWeights;
use crate::route::{RouteEntry, RoutingTable};

fn next_router_id() -> u32 {
    static NEXT: AtomicU32 = AtomicU32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// The capability interface the harness holds engines through.
///
/// Exists so a harness can hold several engine implementations
/// polymorphically; [`Router`] is presently the only implementation.
pub trait RouterBase {
    /// Configures a freshly-created engine. See [`Router::init`].
    ///
    /// # Errors
    ///
    /// See [`Router::init`].
    fn init(
        &mut self,
        port_num: i32,
        external_port: i32,
        external_addr: &str,
        available_addr: &str,
    ) -> Result<(), EngineError>;

    /// Processes one packet. See [`Router::handle`].
    fn handle(&mut self, in_port: i32, buffer: &mut [u8]) -> i32;
}

/// The router engine: port weights, routing table, NAT state, and block
/// set, all owned by a single `&mut self` borrow.
#[derive(Debug)]
pub struct Router {
    id: u32,
    external_port: Option<u16>,
    ports: PortWeights,
    table: RoutingTable,
    nat: NatTable,
    blocks: BlockSet,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            id: 0,
            external_port: None,
            ports: PortWeights::new(0, None),
            table: RoutingTable::new(),
            nat: NatTable::new(),
            blocks: BlockSet::new(),
        }
    }
}

impl Router {
    /// Creates an unconfigured engine. Call [`Router::init`] before
    /// handing it any packets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures this engine: sets `port_num` ports (all administratively
    /// down except `0`, `1` and `external_port`), assigns a fresh
    /// process-unique router id, and, if `external_port != 0`, enumerates
    /// `external_addr` into the routing table (distance `0`, via
    /// `external_port`) and `available_addr` into the NAT pool.
    ///
    /// `external_port == 0` means "no NAT boundary on this engine"; the
    /// external range and pool arguments are ignored in that case.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPort`] if `port_num` is not positive or
    /// `external_port` is out of `0..port_num`. Returns
    /// [`EngineError::InvalidCidr`], [`EngineError::InvalidAddress`],
    /// [`EngineError::PrefixTooLong`] or [`EngineError::RangeTooLarge`] if
    /// `external_addr`/`available_addr` fail to parse or are too wide to
    /// enumerate.
    pub fn init(
        &mut self,
        port_num: i32,
        external_port: i32,
        external_addr: &str,
        available_addr: &str,
    ) -> Result<(), EngineError> {
        let port_num_usize = usize::try_from(port_num)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(EngineError::InvalidPort(external_port, port_num))?;

        let external_port_opt = if external_port == 0 {
            None
        } else {
            let ext = usize::try_from(external_port)
                .ok()
                .filter(|&p| p < port_num_usize)
                .ok_or(EngineError::InvalidPort(external_port, port_num))?;
            Some(u16::try_from(ext).map_err(|_| EngineError::InvalidPort(external_port, port_num))?)
        };

        let mut table = RoutingTable::new();
        let mut nat = NatTable::new();

        if let Some(ext_port) = external_port_opt {
            let ext_cidr = Cidr::parse(external_addr)?;
            ext_cidr.require_enumerable(external_addr)?;
            for ip in ext_cidr.iter() {
                table.insert(ip, RouteEntry::new(0, ext_port, 0));
            }

            let pool_cidr = Cidr::parse(available_addr)?;
            pool_cidr.require_enumerable(available_addr)?;
            for ip in pool_cidr.iter() {
                nat.fill_pool(ip);
            }
        }

        self.id = next_router_id();
        self.ports = PortWeights::new(port_num_usize, external_port_opt.map(usize::from));
        self.external_port = external_port_opt;
        self.table = table;
        self.nat = nat;
        self.blocks = BlockSet::new();

        debug!(id = self.id, port_num, external_port, "router initialized");
        Ok(())
    }

    /// Processes one packet arriving on `in_port`, possibly rewriting
    /// `buffer` in place.
    ///
    /// Returns `-1` to drop, `0` if `buffer` now holds a DV packet the
    /// harness should broadcast, `1` to deliver locally, or `p >= 2` to
    /// forward out local port `p`.
    pub fn handle(&mut self, in_port: i32, buffer: &mut [u8]) -> i32 {
        let Ok(in_port) = u16::try_from(in_port) else {
            warn!(in_port, "negative or oversized port index");
            return -1;
        };

        match Header::packet_type(buffer) {
            Some(PacketType::Data) => self.forward_data(in_port, buffer),
            Some(PacketType::Dv) => self.absorb_dv(in_port, buffer),
            Some(PacketType::Control) => self.apply_control(buffer),
            None => {
                trace!(in_port, "unrecognized or truncated header");
                -1
            }
        }
    }

    fn forward_data(&mut self, in_port: u16, buf: &mut [u8]) -> i32 {
        let (Some(src), Some(dst)) = (Header::src(buf), Header::dst(buf)) else {
            return -1;
        };

        if self.blocks.is_blocked(src) {
            trace!(src, "dropping blocked source");
            return -1;
        }

        if self.external_port == Some(in_port) {
            let Some(internal) = self.nat.reverse_lookup(dst) else {
                trace!(dst, "no reverse NAT binding for inbound packet");
                return -1;
            };
            Header::set_dst(buf, internal);
            match self.table.get(internal).copied() {
                Some(route) if !route.is_poisoned() => i32::from(route.port),
                _ => 1,
            }
        } else {
            match self.table.get(dst).copied() {
                None => 1,
                Some(route) if route.is_poisoned() => 1,
                Some(route) => {
                    let port = route.port;
                    if self.external_port == Some(port) {
                        let Some(external) = self.nat.allocate(src) else {
                            debug!(src, "NAT pool exhausted");
                            return -1;
                        };
                        Header::set_src(buf, external);
                    }
                    i32::from(port)
                }
            }
        }
    }

    fn absorb_dv(&mut self, in_port: u16, buf: &mut [u8]) -> i32 {
        let (Some(advertising_id), Some(entry_count)) = (Header::src(buf), Header::dst(buf)) else {
            return -1;
        };
        let Some(in_port_weight) = self.ports.get(in_port) else {
            warn!(in_port, "DV packet from out-of-range port");
            return -1;
        };
        let Some(entries) = dv::parse_entries(buf, entry_count) else {
            warn!(entry_count, "truncated DV payload");
            return -1;
        };

        let changed = dv::absorb_all(
            &mut self.table,
            self.id,
            in_port,
            in_port_weight,
            advertising_id,
            &entries,
        );

        if !changed {
            return -1;
        }

        match dv::emit(buf, self.id, &self.table) {
            Some(_) => 0,
            None => {
                warn!("buffer too small to re-emit DV packet");
                -1
            }
        }
    }

    fn apply_control(&mut self, buf: &mut [u8]) -> i32 {
        let Some(length) = Header::length(buf) else {
            return -1;
        };

        let parsed = buf
            .get(HEADER_LEN..)
            .ok_or(EngineError::EmptyControlPayload)
            .and_then(|payload| control::parse_payload(payload, length));
        let (verb, arg) = match parsed {
            Ok((verb, arg)) => (verb, arg.to_owned()),
            Err(err) => {
                warn!(%err, "malformed control payload");
                return -1;
            }
        };

        let outcome = control::apply(
            verb,
            &arg,
            &mut self.ports,
            &mut self.table,
            &mut self.nat,
            &mut self.blocks,
        );

        match outcome {
            Ok(Outcome::Applied) => -1,
            Ok(Outcome::EmitDv) => match dv::emit(buf, self.id, &self.table) {
                Some(_) => 0,
                None => {
                    warn!("buffer too small to emit DV packet after control update");
                    -1
                }
            },
            Err(err) => {
                warn!(%err, verb = %verb, "control verb rejected");
                -1
            }
        }
    }
}

impl RouterBase for Router {
    fn init(
        &mut self,
        port_num: i32,
        external_port: i32,
        external_addr: &str,
        available_addr: &str,
    ) -> Result<(), EngineError> {
        Router::init(self, port_num, external_port, external_addr, available_addr)
    }

    fn handle(&mut self, in_port: i32, buffer: &mut [u8]) -> i32 {
        Router::handle(self, in_port, buffer)
    }
}

/// Creates a fresh, unconfigured engine behind the [`RouterBase`]
/// interface, for harnesses that hold engines polymorphically.
#[must_use]
pub fn create_router_object() -> Box<dyn RouterBase> {
    Box::new(Router::new())
}
