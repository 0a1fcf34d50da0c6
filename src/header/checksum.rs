//! Internet checksum (RFC 1071).

/// Computes the Internet checksum of `data`.
///
/// The data is summed as big-endian 16-bit words in one's complement; an odd
/// trailing byte counts as the high byte of a zero-padded word. Carries are
/// folded back in and the result is complemented.
///
/// Store the result big-endian (the header types do this) and the checksum
/// of the whole buffer, checksum field included, becomes zero.
pub fn checksum(data: &[u8]) -> u16 {
	let mut sum: u64 = 0;

	let mut words = data.chunks_exact(2);
	for word in &mut words {
		sum += u16::from_be_bytes([word[0], word[1]]) as u64;
	}
	if let Some(&byte) = words.remainder().first() {
		sum += (byte as u64) << 8;
	}

	while (sum >> 16) != 0 {
		sum = (sum & 0xffff) + (sum >> 16);
	}

	!(sum as u16)
}

/// True when `data` (checksum field included) sums to zero.
pub fn verify(data: &[u8]) -> bool {
	checksum(data) == 0
}
