//! # fnelink
//!
//! Client-side networking core for DVM-style Fixed Network Equipment (FNE)
//! systems. A peer uses this crate to authenticate against a master, exchange
//! encapsulated DMR / P25 / NXDN traffic over UDP, and announce affiliations,
//! registrations and key requests.
//!
//! ## Architecture
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Host System (adapter)                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │           Peer Session (handshake / dispatch / liveness)        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   Protocol Data Units (DMR LC/EMB, P25 PDU/TSBK/KMM, NXDN)      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │       RTP + FNE Framing  /  AES-256 Datagram Wrapping           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │     FEC & Codecs (Trellis, Reed-Solomon, Golay, CRC, ...)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      Transport (UDP)                            │
//! └─────────────────────────────────────────────────────────────────┘

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]      // Many functions can't be const due to trait bounds
#![allow(clippy::doc_markdown)]              // Protocol names in docs
#![allow(clippy::unreadable_literal)]        // Wire constants are clear
#![allow(clippy::cast_possible_truncation)]  // Intentional wire-width narrowing
#![allow(clippy::cast_sign_loss)]            // Stream ids are wire-signed
#![allow(clippy::cast_possible_wrap)]        // Intentional for sequence arithmetic
#![allow(clippy::similar_names)]             // src/dst ids are intentionally named
#![allow(clippy::use_self)]                  // Explicit type names in matches
#![allow(clippy::cognitive_complexity)]      // Complex state machines
#![allow(clippy::too_many_lines)]            // Complete implementations
#![allow(clippy::future_not_send)]           // Async internals
#![allow(clippy::struct_excessive_bools)]    // Boolean peer flags mirror the wire
#![allow(clippy::match_same_arms)]           // Explicit arm per variant is clearer
#![allow(clippy::ignored_unit_patterns)]     // Ok(_) vs Ok(()) is stylistic

pub mod coding;
pub mod config;
pub mod crypto;
pub mod dmr;
pub mod error;
pub mod framing;
pub mod nxdn;
pub mod p25;
pub mod peer;
pub mod system;
pub mod transport;
pub mod types;
pub mod util;

pub use config::PeerConfig;
pub use error::{Error, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest datagram the peer will send or accept.
pub const MAX_DATAGRAM: usize = 1500;

/// RTP generic clock rate the timestamp step derives from.
pub const RTP_GENERIC_CLOCK_RATE: u32 = 8000;

/// Missed pings tolerated before the master link is declared dead.
pub const MAX_MISSED_PEER_PINGS: u32 = 5;

/// Packet sequence sentinel marking call-end and control packets.
pub const RTP_END_OF_CALL_SEQ: u16 = 65535;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PeerConfig;
    pub use crate::error::{Error, Result};
    pub use crate::framing::{FrameEnvelope, NetFunc, NetSubFunc};
    pub use crate::peer::{FnePeer, PeerHandler};
    pub use crate::system::SystemBase;
    pub use crate::transport::{Transport, UdpTransport};
    pub use crate::types::*;
}
