// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The six control-plane verbs.
//!
//! A control packet's payload carries an ASCII verb byte at offset 0, a
//! single-space separator at offset 1, and the verb's argument from offset
//! 2 to the header's declared `length`. The reference implementation this
//! protocol was distilled from NUL-terminates the argument in place before
//! parsing it as a C string; this crate instead slices the argument
//! directly out of the payload using the declared length, which needs no
//! NUL terminator and cannot read past the payload.
//!
//! Each verb below is its own function, mirroring the private-method-per
//! -verb decomposition of the original source (`release_nat`,
//! `port_value_change`, `add_host`, `block`, `unblock`) rather than one
//! large match arm.

use crate::addr::parse_ip;
use crate::block::BlockSet;
use crate::error::EngineError;
use crate::nat::NatTable;
use crate::ports::PortWeights;
use crate::route::{RouteEntry, RoutingTable};
use tracing::{debug, warn};

/// Extracts the verb byte and argument string from a control packet's
/// payload, given the header's declared `length`.
///
/// # Errors
///
/// Returns [`EngineError::EmptyControlPayload`] if the payload is too
/// short to carry a verb byte and separator.
pub fn parse_payload(payload: &[u8], length: u16) -> Result<(char, &str), EngineError> {
    let length = length as usize;
    let payload = payload
        .get(..length)
        .ok_or(EngineError::EmptyControlPayload)?;
    if payload.len() < 2 {
        return Err(EngineError::EmptyControlPayload);
    }
    let verb = char::from(payload[0]);
    let arg = std::str::from_utf8(&payload[2..])
        .unwrap_or("")
        .trim_end_matches('\0');
    Ok((verb, arg))
}

/// Verb `'1'`: release a source's NAT binding, if it has one.
///
/// # Errors
///
/// Returns [`EngineError::MalformedArgument`] if `arg` is not a
/// dotted-quad address.
pub fn release_nat(nat: &mut NatTable, arg: &str) -> Result<(), EngineError> {
    let internal = parse_ip(arg).map_err(|_| EngineError::MalformedArgument {
        verb: '1',
        arg: arg.to_owned(),
    })?;
    let released = nat.release(internal);
    debug!(internal, released, "release_nat");
    Ok(())
}

fn split_port_and_rest(arg: &str) -> Option<(u16, &str)> {
    let (port_str, rest) = arg.split_once(' ')?;
    let port: u16 = port_str.parse().ok()?;
    Some((port, rest))
}

/// Verb `'2'`: change a port's link weight, propagating the adjustment
/// into every routing-table entry routed via that port.
///
/// See `SPEC_FULL.md` §4.3 for the exact distance-adjustment semantics.
///
/// # Errors
///
/// Returns [`EngineError::MalformedArgument`] if `arg` is not
/// `"<port> <value>"`, or [`EngineError::InvalidPort`] if `port` is out of
/// range for this engine.
pub fn set_port_weight(
    ports: &mut PortWeights,
    table: &mut RoutingTable,
    arg: &str,
) -> Result<(), EngineError> {
    let malformed = || EngineError::MalformedArgument {
        verb: '2',
        arg: arg.to_owned(),
    };
    let (port, value_str) = split_port_and_rest(arg).ok_or_else(malformed)?;
    let new_weight: i32 = value_str.trim().parse().map_err(|_| malformed())?;

    let old_weight = ports
        .get(port)
        .ok_or_else(|| EngineError::InvalidPort(i32::from(port), i32::try_from(ports.len()).unwrap_or(i32::MAX)))?;

    if !ports.set(port, new_weight) {
        return Err(EngineError::InvalidPort(
            i32::from(port),
            i32::try_from(ports.len()).unwrap_or(i32::MAX),
        ));
    }

    if new_weight == crate::ports::LINK_DOWN {
        table.poison_port(port);
    } else if old_weight != crate::ports::LINK_DOWN {
        let delta = new_weight - old_weight;
        table.adjust_port_distance(port, delta);
    }
    debug!(port, old_weight, new_weight, "set_port_weight");
    Ok(())
}

/// Verb `'3'`: register a directly-attached host at distance `0`.
///
/// # Errors
///
/// Returns [`EngineError::MalformedArgument`] if `arg` is not `"<port>
/// <dotted-quad>"`.
pub fn add_host(
    table: &mut RoutingTable,
    ports: &mut PortWeights,
    arg: &str,
) -> Result<(), EngineError> {
    let malformed = || EngineError::MalformedArgument {
        verb: '3',
        arg: arg.to_owned(),
    };
    let (port, ip_str) = split_port_and_rest(arg).ok_or_else(malformed)?;
    let ip = parse_ip(ip_str.trim()).map_err(|_| malformed())?;
    table.insert(ip, RouteEntry::new(0, port, 0));
    ports.set(port, 0);
    debug!(ip, port, "add_host");
    Ok(())
}

/// Verb `'5'`: add a source address to the block set.
///
/// # Errors
///
/// Returns [`EngineError::MalformedArgument`] if `arg` is not a
/// dotted-quad address.
pub fn block(blocks: &mut BlockSet, arg: &str) -> Result<(), EngineError> {
    let ip = parse_ip(arg).map_err(|_| EngineError::MalformedArgument {
        verb: '5',
        arg: arg.to_owned(),
    })?;
    blocks.block(ip);
    debug!(ip, "block");
    Ok(())
}

/// Verb `'6'`: remove a source address from the block set.
///
/// # Errors
///
/// Returns [`EngineError::MalformedArgument`] if `arg` is not a
/// dotted-quad address.
pub fn unblock(blocks: &mut BlockSet, arg: &str) -> Result<(), EngineError> {
    let ip = parse_ip(arg).map_err(|_| EngineError::MalformedArgument {
        verb: '6',
        arg: arg.to_owned(),
    })?;
    blocks.unblock(ip);
    debug!(ip, "unblock");
    Ok(())
}

/// Outcome of applying a control command: whether the engine should now
/// emit a DV packet (verb `'0'`, or verb `'2'` falling through into it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Apply completed; no DV packet should be emitted.
    Applied,
    /// Apply completed (or the verb was itself a trigger); emit a DV
    /// packet now.
    EmitDv,
}

/// Dispatches a parsed `(verb, arg)` pair to its handler.
///
/// This is the one place that reproduces the original source's
/// intentional fallthrough: verb `'2'` updates port weights and then
/// falls through into the same DV-emit behavior as verb `'0'`, so that
/// neighbors learn of the change immediately. That sequencing is made
/// explicit here (an `Outcome::EmitDv` returned from both branches)
/// instead of relying on `match` fallthrough, which Rust doesn't have.
///
/// # Errors
///
/// Propagates [`EngineError`] from whichever verb handler ran, or returns
/// [`EngineError::UnknownVerb`] for a verb outside `{0,1,2,3,5,6}`.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    verb: char,
    arg: &str,
    ports: &mut PortWeights,
    table: &mut RoutingTable,
    nat: &mut NatTable,
    blocks: &mut BlockSet,
) -> Result<Outcome, EngineError> {
    match verb {
        '0' => Ok(Outcome::EmitDv),
        '1' => {
            release_nat(nat, arg)?;
            Ok(Outcome::Applied)
        }
        '2' => {
            set_port_weight(ports, table, arg)?;
            Ok(Outcome::EmitDv)
        }
        '3' => {
            add_host(table, ports, arg)?;
            Ok(Outcome::Applied)
        }
        '5' => {
            block(blocks, arg)?;
            Ok(Outcome::Applied)
        }
        '6' => {
            unblock(blocks, arg)?;
            Ok(Outcome::Applied)
        }
        other => {
            warn!(verb = %other, "unknown control verb");
            Err(EngineError::UnknownVerb(other))
        }
    }
}
