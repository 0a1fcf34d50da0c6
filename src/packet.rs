//! Immutable byte payloads moved in and out of sockets.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

/// A sequence of bytes sent or received in one socket call.
///
/// The length is exactly the length of whatever it was built from; nothing
/// is padded or NUL-terminated. Cloning is cheap (reference counted).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Packet {
	data: Bytes,
}

impl Packet {
	/// Copies `data` into a new packet.
	pub fn new(data: &[u8]) -> Self {
		Self { data: Bytes::copy_from_slice(data) }
	}

	/// An empty packet, as returned by a receive that saw end of stream.
	pub fn empty() -> Self {
		Self::default()
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	#[inline]
	pub fn as_bytes(&self) -> &[u8] {
		&self.data
	}

	/// Text view of the payload. Invalid UTF-8 is replaced, never dropped,
	/// so the byte count of valid text matches `len()`.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.data)
	}

	pub fn into_bytes(self) -> Bytes {
		self.data
	}
}

impl fmt::Debug for Packet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Packet")
			.field("len", &self.data.len())
			.field("data", &self.data)
			.finish()
	}
}

impl AsRef<[u8]> for Packet {
	fn as_ref(&self) -> &[u8] {
		&self.data
	}
}

impl From<&str> for Packet {
	fn from(text: &str) -> Self {
		Self::new(text.as_bytes())
	}
}

impl From<String> for Packet {
	fn from(text: String) -> Self {
		Self { data: Bytes::from(text) }
	}
}

impl From<&[u8]> for Packet {
	fn from(data: &[u8]) -> Self {
		Self::new(data)
	}
}

impl From<Vec<u8>> for Packet {
	fn from(data: Vec<u8>) -> Self {
		Self { data: Bytes::from(data) }
	}
}

impl From<Bytes> for Packet {
	fn from(data: Bytes) -> Self {
		Self { data }
	}
}
