use zerocopy::byteorder::{NetworkEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::checksum;

/// ICMPv4 message types used by probing tools.
pub mod icmpv4 {
	pub const ECHO_REPLY: u8 = 0;
	pub const DEST_UNREACH: u8 = 3;
	pub const ECHO_REQUEST: u8 = 8;
	pub const TIME_EXCEEDED: u8 = 11;
}

/// ICMPv6 message types used by probing tools.
pub mod icmpv6 {
	pub const DEST_UNREACH: u8 = 1;
	pub const TIME_EXCEEDED: u8 = 3;
	pub const ECHO_REQUEST: u8 = 128;
	pub const ECHO_REPLY: u8 = 129;
}

/// ICMPv4 header (8 bytes). For echo messages the rest-of-header holds the
/// identifier in the high half and the sequence number in the low half.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Icmpv4Header {
	pub kind: u8,
	pub code: u8,
	pub checksum: U16<NetworkEndian>,
	pub rest: U32<NetworkEndian>,
}

impl Icmpv4Header {
	pub const SIZE: usize = std::mem::size_of::<Self>();

	pub fn new(kind: u8, code: u8, checksum: u16, rest: u32) -> Self {
		Self {
			kind,
			code,
			checksum: U16::new(checksum),
			rest: U32::new(rest),
		}
	}

	/// An echo request/reply with checksum still zero.
	pub fn echo(kind: u8, identifier: u16, sequence: u16) -> Self {
		Self::new(kind, 0, 0, ((identifier as u32) << 16) | sequence as u32)
	}

	pub fn identifier(&self) -> u16 {
		(self.rest.get() >> 16) as u16
	}

	pub fn sequence(&self) -> u16 {
		self.rest.get() as u16
	}

	/// Sets the checksum over this header followed by `payload`.
	pub fn fill_checksum(&mut self, payload: &[u8]) {
		self.checksum = U16::new(0);
		let mut message = Vec::with_capacity(Self::SIZE + payload.len());
		message.extend_from_slice(<Self as IntoBytes>::as_bytes(self));
		message.extend_from_slice(payload);
		self.checksum = U16::new(checksum(&message));
	}

	pub fn as_bytes(&self) -> &[u8] {
		<Self as IntoBytes>::as_bytes(self)
	}

	pub fn parse(data: &[u8]) -> Option<Self> {
		Self::read_from_prefix(data).ok().map(|(header, _)| header)
	}
}

/// ICMPv6 header (8 bytes). The last four bytes are message specific and
/// can be viewed as one 32-bit word, two 16-bit words, or four bytes.
///
/// The kernel fills the checksum of messages sent on ICMPv6 raw sockets.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Icmpv6Header {
	pub kind: u8,
	pub code: u8,
	pub checksum: U16<NetworkEndian>,
	pub data: [u8; 4],
}

impl Icmpv6Header {
	pub const SIZE: usize = std::mem::size_of::<Self>();

	pub fn new(kind: u8, code: u8, checksum: u16, rest: u32) -> Self {
		Self {
			kind,
			code,
			checksum: U16::new(checksum),
			data: rest.to_be_bytes(),
		}
	}

	pub fn echo(kind: u8, identifier: u16, sequence: u16) -> Self {
		Self::new(kind, 0, 0, ((identifier as u32) << 16) | sequence as u32)
	}

	pub fn data32(&self) -> u32 {
		u32::from_be_bytes(self.data)
	}

	pub fn data16(&self) -> [u16; 2] {
		[
			u16::from_be_bytes([self.data[0], self.data[1]]),
			u16::from_be_bytes([self.data[2], self.data[3]]),
		]
	}

	pub fn data8(&self) -> [u8; 4] {
		self.data
	}

	pub fn set_data32(&mut self, value: u32) {
		self.data = value.to_be_bytes();
	}

	pub fn set_data16(&mut self, value: [u16; 2]) {
		self.data[..2].copy_from_slice(&value[0].to_be_bytes());
		self.data[2..].copy_from_slice(&value[1].to_be_bytes());
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
	use crate::header::verify;

	#[test]
	fn icmpv4_echo_layout_and_checksum() {
		let payload = b"Hello, mlab";
		let mut header = Icmpv4Header::new(icmpv4::ECHO_REQUEST, 0, 0, 0xabcd1234);
		assert_eq!(header.as_bytes(), &[8, 0, 0, 0, 0xab, 0xcd, 0x12, 0x34]);
		assert_eq!(header.identifier(), 0xabcd);
		assert_eq!(header.sequence(), 0x1234);

		header.fill_checksum(payload);
		let mut wire = header.as_bytes().to_vec();
		wire.extend_from_slice(payload);
		assert!(verify(&wire));

		// Flipping the type invalidates it until the checksum is redone.
		header.kind = icmpv4::ECHO_REPLY;
		let mut wire = header.as_bytes().to_vec();
		wire.extend_from_slice(payload);
		assert!(!verify(&wire));
		header.fill_checksum(payload);
		wire[..Icmpv4Header::SIZE].copy_from_slice(header.as_bytes());
		assert!(verify(&wire));
	}

	#[test]
	fn icmpv6_data_views() {
		let mut header = Icmpv6Header::new(icmpv6::ECHO_REQUEST, 0, 0, 0xcdef5678);
		assert_eq!(Icmpv6Header::SIZE, 8);
		assert_eq!(header.as_bytes(), &[128, 0, 0, 0, 0xcd, 0xef, 0x56, 0x78]);
		assert_eq!(header.data32(), 0xcdef5678);
		assert_eq!(header.data16(), [0xcdef, 0x5678]);
		assert_eq!(header.data8(), [0xcd, 0xef, 0x56, 0x78]);

		header.set_data16([1, 2]);
		assert_eq!(header.data32(), 0x0001_0002);
		assert_eq!(Icmpv6Header::parse(header.as_bytes()), Some(header));
	}

	#[test]
	fn echo_packs_identifier_and_sequence() {
		let header = Icmpv6Header::echo(icmpv6::ECHO_REQUEST, 0x0102, 0x0304);
		assert_eq!(header.data8(), [1, 2, 3, 4]);
		let header = Icmpv4Header::echo(icmpv4::ECHO_REQUEST, 7, 9);
		assert_eq!(header.identifier(), 7);
		assert_eq!(header.sequence(), 9);
	}
}
