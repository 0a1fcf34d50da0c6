use zerocopy::byteorder::{NetworkEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// UDP header (8 bytes). A zero checksum means "not computed" over IPv4.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct UdpHeader {
	pub source_port: U16<NetworkEndian>,
	pub dest_port: U16<NetworkEndian>,
	/// Header plus payload, in bytes.
	pub length: U16<NetworkEndian>,
	pub checksum: U16<NetworkEndian>,
}

impl UdpHeader {
	pub const SIZE: usize = std::mem::size_of::<Self>();

	pub fn new(source_port: u16, dest_port: u16, length: u16, checksum: u16) -> Self {
		Self {
			source_port: U16::new(source_port),
			dest_port: U16::new(dest_port),
			length: U16::new(length),
			checksum: U16::new(checksum),
		}
	}

	pub fn as_bytes(&self) -> &[u8] {
		<Self as IntoBytes>::as_bytes(self)
	}

	pub fn parse(data: &[u8]) -> Option<Self> {
		Self::read_from_prefix(data).ok().map(|(header, _)| header)
	}
}
