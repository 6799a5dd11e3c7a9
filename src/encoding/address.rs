//! Fixed-width address slot used inside tokens.
//!
//! ```text
//!   byte 0      type (0 none, 1 IPv4, 2 IPv6)
//!   IPv4        bytes 1..5 octets, bytes 5..7 port (LE)
//!   IPv6        bytes 1..17 address, bytes 17..19 port (LE)
//! ```
//!
//! Unused bytes are zero.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use super::EncodingError;

/// Size of an encoded address slot.
pub const ADDRESS_BYTES: usize = 19;

/// Address discriminant shared by the slot codec and `serialize_address`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressType {
    None = 0,
    Ipv4 = 1,
    Ipv6 = 2,
}

impl AddressType {
    pub fn of(address: Option<&SocketAddr>) -> Self {
        match address {
            None => AddressType::None,
            Some(SocketAddr::V4(_)) => AddressType::Ipv4,
            Some(SocketAddr::V6(_)) => AddressType::Ipv6,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(AddressType::None),
            1 => Some(AddressType::Ipv4),
            2 => Some(AddressType::Ipv6),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Encode an optional address into a fixed slot.
pub fn write_address(address: Option<&SocketAddr>) -> [u8; ADDRESS_BYTES] {
    let mut slot = [0u8; ADDRESS_BYTES];
    slot[0] = AddressType::of(address).to_byte();
    match address {
        None => {}
        Some(SocketAddr::V4(a)) => {
            slot[1..5].copy_from_slice(&a.ip().octets());
            slot[5..7].copy_from_slice(&a.port().to_le_bytes());
        }
        Some(SocketAddr::V6(a)) => {
            slot[1..17].copy_from_slice(&a.ip().octets());
            slot[17..19].copy_from_slice(&a.port().to_le_bytes());
        }
    }
    slot
}

/// Decode a fixed address slot. Unknown type bytes are rejected.
pub fn read_address(slot: &[u8; ADDRESS_BYTES]) -> Result<Option<SocketAddr>, EncodingError> {
    match AddressType::from_byte(slot[0]) {
        Some(AddressType::None) => Ok(None),
        Some(AddressType::Ipv4) => {
            let ip = Ipv4Addr::new(slot[1], slot[2], slot[3], slot[4]);
            let port = u16::from_le_bytes([slot[5], slot[6]]);
            Ok(Some(SocketAddr::V4(SocketAddrV4::new(ip, port))))
        }
        Some(AddressType::Ipv6) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&slot[1..17]);
            let port = u16::from_le_bytes([slot[17], slot[18]]);
            Ok(Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(octets),
                port,
                0,
                0,
            ))))
        }
        None => Err(EncodingError::InvalidAddressType(u32::from(slot[0]))),
    }
}

/// Parse `"ip:port"`, `"[v6]:port"`, or a bare IP (port 0).
pub fn parse_address(s: &str) -> Result<SocketAddr, EncodingError> {
    let s = s.trim();
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, 0))
        .map_err(|_| EncodingError::InvalidAddress(s.to_string()))
}
