use std::net::{Ipv4Addr, Ipv6Addr};

use zerocopy::byteorder::{NetworkEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{checksum, parse_v4, parse_v6};

/// IPv4 header without options (20 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Ipv4Header {
	/// Version in the high nibble, header length in 32-bit words in the low.
	pub ver_ihl: u8,
	pub tos: u8,
	pub total_len: U16<NetworkEndian>,
	pub id: U16<NetworkEndian>,
	/// Flags and fragment offset.
	pub offset: U16<NetworkEndian>,
	pub ttl: u8,
	pub protocol: u8,
	pub checksum: U16<NetworkEndian>,
	pub source: [u8; 4],
	pub destination: [u8; 4],
}

impl Ipv4Header {
	pub const SIZE: usize = std::mem::size_of::<Self>();

	/// Version 4, 20-byte header, source left as `0.0.0.0` for the kernel
	/// or the caller to fill in.
	pub fn new(total_len: u16, ttl: u8, protocol: u8, destination: &str) -> std::io::Result<Self> {
		Ok(Self {
			ver_ihl: (4 << 4) | 5,
			tos: 0,
			total_len: U16::new(total_len),
			id: U16::new(0),
			offset: U16::new(0),
			ttl,
			protocol,
			checksum: U16::new(0),
			source: [0; 4],
			destination: parse_v4(destination)?,
		})
	}

	pub fn version(&self) -> u8 {
		self.ver_ihl >> 4
	}

	/// Header length in bytes.
	pub fn header_len(&self) -> usize {
		((self.ver_ihl & 0x0f) as usize) * 4
	}

	pub fn set_source(&mut self, addr: &str) -> std::io::Result<()> {
		self.source = parse_v4(addr)?;
		Ok(())
	}

	pub fn set_destination(&mut self, addr: &str) -> std::io::Result<()> {
		self.destination = parse_v4(addr)?;
		Ok(())
	}

	pub fn source(&self) -> String {
		Ipv4Addr::from(self.source).to_string()
	}

	pub fn destination(&self) -> String {
		Ipv4Addr::from(self.destination).to_string()
	}

	/// Recomputes the header checksum over the 20 header bytes.
	pub fn fill_checksum(&mut self) {
		self.checksum = U16::new(0);
		self.checksum = U16::new(checksum(<Self as IntoBytes>::as_bytes(self)));
	}

	pub fn as_bytes(&self) -> &[u8] {
		<Self as IntoBytes>::as_bytes(self)
	}

	/// Reads a header from the front of `data`, e.g. a raw IPv4 receive.
	pub fn parse(data: &[u8]) -> Option<Self> {
		Self::read_from_prefix(data).ok().map(|(header, _)| header)
	}
}

/// IPv6 fixed header (40 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Ipv6Header {
	/// Version (4 bits), traffic class (8 bits), flow label (20 bits).
	pub ver_tc_flow: U32<NetworkEndian>,
	pub payload_len: U16<NetworkEndian>,
	pub next_header: u8,
	pub hop_limit: u8,
	pub source: [u8; 16],
	pub destination: [u8; 16],
}

impl Ipv6Header {
	pub const SIZE: usize = std::mem::size_of::<Self>();

	pub fn new(payload_len: u16, hop_limit: u8, next_header: u8, destination: &str) -> std::io::Result<Self> {
		Ok(Self {
			ver_tc_flow: U32::new(6 << 28),
			payload_len: U16::new(payload_len),
			next_header,
			hop_limit,
			source: [0; 16],
			destination: parse_v6(destination)?,
		})
	}

	pub fn version(&self) -> u8 {
		(self.ver_tc_flow.get() >> 28) as u8
	}

	pub fn traffic_class(&self) -> u8 {
		(self.ver_tc_flow.get() >> 20) as u8
	}

	pub fn flow_label(&self) -> u32 {
		self.ver_tc_flow.get() & 0x000f_ffff
	}

	pub fn set_source(&mut self, addr: &str) -> std::io::Result<()> {
		self.source = parse_v6(addr)?;
		Ok(())
	}

	pub fn set_destination(&mut self, addr: &str) -> std::io::Result<()> {
		self.destination = parse_v6(addr)?;
		Ok(())
	}

	pub fn source(&self) -> String {
		Ipv6Addr::from(self.source).to_string()
	}

	pub fn destination(&self) -> String {
		Ipv6Addr::from(self.destination).to_string()
	}

	pub fn as_bytes(&self) -> &[u8] {
		<Self as IntoBytes>::as_bytes(self)
	}

	pub fn parse(data: &[u8]) -> Option<Self> {
		Self::read_from_prefix(data).ok().map(|(header, _)| header)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::header::{verify, DEFAULT_TTL};

	#[test]
	fn ipv4_layout() {
		assert_eq!(Ipv4Header::SIZE, 20);
		let mut header = Ipv4Header::new(28, DEFAULT_TTL, libc::IPPROTO_ICMP as u8, "10.0.0.2").unwrap();
		header.set_source("10.0.0.1").unwrap();
		header.id = U16::new(0x1234);

		let bytes = header.as_bytes();
		assert_eq!(bytes[0], 0x45);
		assert_eq!(&bytes[2..4], &[0x00, 28]);
		assert_eq!(&bytes[4..6], &[0x12, 0x34]);
		assert_eq!(bytes[8], 64);
		assert_eq!(bytes[9], 1);
		assert_eq!(&bytes[12..16], &[10, 0, 0, 1]);
		assert_eq!(&bytes[16..20], &[10, 0, 0, 2]);
		assert_eq!(header.version(), 4);
		assert_eq!(header.header_len(), 20);
	}

	#[test]
	fn ipv4_addresses_as_text() {
		let mut header = Ipv4Header::new(20, 30, 1, "127.0.0.1").unwrap();
		assert_eq!(header.source(), "0.0.0.0");
		assert_eq!(header.destination(), "127.0.0.1");
		header.set_destination("192.168.1.7").unwrap();
		assert_eq!(header.destination(), "192.168.1.7");

		assert!(header.set_source("::1").is_err());
		assert!(header.set_source("localhost").is_err());
		assert!(Ipv4Header::new(20, 30, 1, "not an address").is_err());
	}

	#[test]
	fn ipv4_header_checksum_verifies() {
		let mut header = Ipv4Header::new(84, 64, 1, "8.8.8.8").unwrap();
		header.set_source("192.168.0.10").unwrap();
		header.fill_checksum();
		assert_ne!(header.checksum.get(), 0);
		assert!(verify(header.as_bytes()));
	}

	#[test]
	fn ipv4_parse_reads_prefix() {
		let header = Ipv4Header::new(28, 64, 1, "127.0.0.1").unwrap();
		let mut wire = header.as_bytes().to_vec();
		wire.extend_from_slice(&[8, 0, 0, 0]);
		assert_eq!(Ipv4Header::parse(&wire), Some(header));
		assert_eq!(Ipv4Header::parse(&wire[..10]), None);
	}

	#[test]
	fn ipv6_layout() {
		assert_eq!(Ipv6Header::SIZE, 40);
		let mut header = Ipv6Header::new(16, 30, libc::IPPROTO_ICMPV6 as u8, "::1").unwrap();
		header.set_source("fe80::1").unwrap();

		let bytes = header.as_bytes();
		assert_eq!(&bytes[0..4], &[0x60, 0, 0, 0]);
		assert_eq!(&bytes[4..6], &[0, 16]);
		assert_eq!(bytes[6], 58);
		assert_eq!(bytes[7], 30);
		assert_eq!(bytes[8], 0xfe);
		assert_eq!(bytes[39], 1);
		assert_eq!(header.version(), 6);
		assert_eq!(header.traffic_class(), 0);
		assert_eq!(header.flow_label(), 0);
		assert_eq!(header.source(), "fe80::1");
		assert_eq!(header.destination(), "::1");
		assert!(header.set_destination("127.0.0.1").is_err());
	}
}
