//! Session Response Fragments
//!
//! Wire pieces the backend embeds in its per-session responses: the route
//! update that tells a client whether to go direct, take a new route or
//! continue the current one, and the bounded list of nearby relays a client
//! should measure.

mod near;
mod update;

pub use near::{NearRelay, NearRelays};
pub use update::RouteUpdate;

use crate::token::{ENCRYPTED_CONTINUE_TOKEN_BYTES, ENCRYPTED_ROUTE_TOKEN_BYTES};

/// Most relays a client is asked to measure.
pub const MAX_NEAR_RELAYS: usize = 32;

/// Discriminant for what a route update carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UpdateType {
    /// Send straight to the server; no tokens.
    #[default]
    Direct = 0,
    /// A new path; route token chain follows.
    Route = 1,
    /// Same path, extended lifetime; continue token chain follows.
    Continue = 2,
}

impl UpdateType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(UpdateType::Direct),
            1 => Some(UpdateType::Route),
            2 => Some(UpdateType::Continue),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Sealed token stride for this update, zero for direct.
    pub fn token_stride(self) -> usize {
        match self {
            UpdateType::Direct => 0,
            UpdateType::Route => ENCRYPTED_ROUTE_TOKEN_BYTES,
            UpdateType::Continue => ENCRYPTED_CONTINUE_TOKEN_BYTES,
        }
    }
}
