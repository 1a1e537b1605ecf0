// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Error taxonomy for the router engine.
//!
//! The public entry points ([`crate::router::Router::init`] and
//! [`crate::router::Router::handle`]) are contractually bound to the coarse
//! `i32` return convention described in the crate docs. Internally, though,
//! failures are represented with this richer type so that misconfiguration
//! at `init` time (a malformed CIDR, an out-of-range port count) is
//! diagnosable instead of collapsing straight to a magic number.

use thiserror::Error;

/// Errors produced while configuring or operating a [`crate::router::Router`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A dotted-quad IPv4 address string could not be parsed.
    #[error("invalid dotted-quad address: {0:?}")]
    InvalidAddress(String),

    /// A `a.b.c.d/n` CIDR string could not be parsed.
    #[error("invalid CIDR string: {0:?}")]
    InvalidCidr(String),

    /// A CIDR's prefix length exceeded 32 bits.
    #[error("prefix length {0} exceeds 32 bits")]
    PrefixTooLong(u8),

    /// A configured external or pool range is wider than this engine will
    /// enumerate (see `SPEC_FULL.md` §9, "external range representation").
    #[error("range {0} is too large to enumerate (min /24)")]
    RangeTooLarge(String),

    /// `port_num` or a referenced port index was out of bounds.
    #[error("invalid port index {0} (port_num is {1})")]
    InvalidPort(i32, i32),

    /// A control packet's verb byte was not one of the six known verbs.
    #[error("unknown control verb {0:?}")]
    UnknownVerb(char),

    /// A control packet's argument did not match the shape its verb expects.
    #[error("malformed control argument for verb {verb:?}: {arg:?}")]
    MalformedArgument {
        /// The verb whose argument was malformed.
        verb: char,
        /// The offending argument text.
        arg: String,
    },

    /// A control packet carried no parseable verb/argument at all.
    #[error("empty or truncated control payload")]
    EmptyControlPayload,
}
