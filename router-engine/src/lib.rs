// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet-processing engine for a software router combining
//! distance-vector routing, NAT, and a small control-plane command set.
//!
//! The engine is invoked packet-by-packet by a harness that owns the
//! sockets: [`router::Router::init`] configures an instance, and
//! [`router::Router::handle`] processes one packet, returning `-1` (drop),
//! `0` (the buffer now holds a DV packet to broadcast), `1` (deliver
//! locally) or `p >= 2` (forward out local port `p`). The engine itself
//! never performs I/O and is single-threaded, single-owner: there is no
//! `unsafe`, no interior mutability, and no shared ownership anywhere in
//! this crate.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod addr;
pub mod block;
pub mod control;
pub mod dv;
pub mod error;
pub mod header;
pub mod nat;
pub mod ports;
pub mod route;
pub mod router;

pub use error::EngineError;
pub use router::{create_router_object, Router, RouterBase};
