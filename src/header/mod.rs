//! Wire-format protocol headers for hand-built packets.
//!
//! Every header is a `#[repr(C)]` record of alignment 1 whose multi-byte
//! fields are stored in network byte order, so `as_bytes()` is the exact
//! on-the-wire form. Addresses are read and written as text; conversion is
//! numeric only and never consults DNS.

mod checksum;
mod icmp;
mod ip;
mod udp;

pub use self::checksum::{checksum, verify};
pub use self::icmp::{Icmpv4Header, Icmpv6Header, icmpv4, icmpv6};
pub use self::ip::{Ipv4Header, Ipv6Header};
pub use self::udp::UdpHeader;

use std::net::{Ipv4Addr, Ipv6Addr};
use crate::error::SocketError;

/// TTL / hop limit used when the caller has no preference.
pub const DEFAULT_TTL: u8 = 64;

pub(crate) fn parse_v4(text: &str) -> std::io::Result<[u8; 4]> {
	text.parse::<Ipv4Addr>()
		.map(|ip| ip.octets())
		.map_err(|_| SocketError::InvalidAddress { reason: "not an IPv4 literal" }.into())
}

pub(crate) fn parse_v6(text: &str) -> std::io::Result<[u8; 16]> {
	text.parse::<Ipv6Addr>()
		.map(|ip| ip.octets())
		.map_err(|_| SocketError::InvalidAddress { reason: "not an IPv6 literal" }.into())
}
