mod accepted;
mod base;
mod builder;
mod client;
mod listener;
mod options;
mod raw;

pub use self::accepted::AcceptedSocket;
pub use self::base::Socket;
pub use self::builder::{BufferConfig, ClientBuilder, ListenConfig, DEFAULT_TIMEOUT};
pub use self::client::ClientSocket;
pub use self::listener::ListenSocket;
pub use self::options::{
	Icmpv6Filter, recv_buffer_size, send_buffer_size, set_ip_hdrincl, set_icmpv6_filter,
	set_recv_buffer_size, set_recv_timeout, set_reuse_addr, set_send_buffer_size, set_send_timeout,
};
pub use self::raw::RawSocket;

use std::fmt;

use tracing::error;

use crate::addr::Family;
use crate::error::errno;
use crate::packet::Packet;

/// What kind of socket to open.
///
/// - `Stream`: reliable, ordered byte stream (TCP)
/// - `Datagram`: unreliable, unordered packets (UDP)
/// - `Raw`: whole IP packets (IPv4) or ICMPv6 messages (IPv6)
/// - `Icmp`: ICMP messages on a raw socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
	Stream,
	Datagram,
	Raw,
	Icmp,
}

/*
  ┌──────────┬─────────────┬──────────────────────┬──────────────────────┐
  │   Type   │  socket()   │   protocol (IPv4)    │   protocol (IPv6)    │
  ├──────────┼─────────────┼──────────────────────┼──────────────────────┤
  │ Stream   │ SOCK_STREAM │ 0                    │ 0                    │
  ├──────────┼─────────────┼──────────────────────┼──────────────────────┤
  │ Datagram │ SOCK_DGRAM  │ 0                    │ 0                    │
  ├──────────┼─────────────┼──────────────────────┼──────────────────────┤
  │ Raw      │ SOCK_RAW    │ IPPROTO_RAW          │ IPPROTO_ICMPV6       │
  ├──────────┼─────────────┼──────────────────────┼──────────────────────┤
  │ Icmp     │ SOCK_RAW    │ IPPROTO_ICMP         │ IPPROTO_ICMPV6       │
  └──────────┴─────────────┴──────────────────────┴──────────────────────┘
*/

impl SocketType {
	/// Returns the libc constant passed as the `socket()` type.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			SocketType::Stream => libc::SOCK_STREAM,
			SocketType::Datagram => libc::SOCK_DGRAM,
			SocketType::Raw | SocketType::Icmp => libc::SOCK_RAW,
		}
	}

	/// Protocol number for this type on `family`.
	pub fn protocol(self, family: Family) -> libc::c_int {
		match (self, family) {
			(SocketType::Stream | SocketType::Datagram, _) => 0,
			(SocketType::Raw, Family::Ipv4) => libc::IPPROTO_RAW,
			(SocketType::Icmp, Family::Ipv4) => libc::IPPROTO_ICMP,
			(SocketType::Raw | SocketType::Icmp, Family::Ipv6) => libc::IPPROTO_ICMPV6,
		}
	}

	/// True for the two kinds that `RawSocket` opens.
	pub fn is_raw(self) -> bool {
		matches!(self, SocketType::Raw | SocketType::Icmp)
	}
}

impl fmt::Display for SocketType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SocketType::Stream => f.write_str("stream"),
			SocketType::Datagram => f.write_str("datagram"),
			SocketType::Raw => f.write_str("raw"),
			SocketType::Icmp => f.write_str("ICMP"),
		}
	}
}

/// Send/receive capability, implemented by every socket that carries data.
///
/// `ListenSocket` does not implement it: accept first.
pub trait Transport {
	/// Sends `packet` in one call. A short send is not an error; the
	/// returned count says how much went out.
	fn send(&self, packet: &Packet) -> std::io::Result<usize>;

	/// Receives at most `count` bytes in one call. An empty packet means
	/// the peer closed.
	fn receive(&mut self, count: usize) -> std::io::Result<Packet>;

	/// Like `send`, for callers with no recovery path.
	///
	/// # Panics
	/// If the send fails.
	fn send_or_die(&self, packet: &Packet) -> usize {
		or_die(self.send(packet), "send")
	}

	/// Like `receive`, for callers with no recovery path.
	///
	/// # Panics
	/// If the receive fails.
	fn receive_or_die(&mut self, count: usize) -> Packet {
		or_die(self.receive(count), "receive")
	}
}

/// Unwraps `result`, logging and panicking with `what` on failure.
pub(crate) fn or_die<T>(result: std::io::Result<T>, what: impl fmt::Display) -> T {
	match result {
		Ok(value) => value,
		Err(err) => {
			error!(error = %err, "{what} failed");
			panic!("{what} failed: {err}");
		}
	}
}

/// Runs a syscall until it stops failing with `EINTR`.
pub(crate) fn retry_eintr<F: FnMut() -> isize>(mut call: F) -> isize {
	loop {
		let n = call();
		if n == -1 && errno() == libc::EINTR {
			continue;
		}
		return n;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn protocol_table() {
		assert_eq!(SocketType::Stream.protocol(Family::Ipv4), 0);
		assert_eq!(SocketType::Datagram.protocol(Family::Ipv6), 0);
		assert_eq!(SocketType::Raw.protocol(Family::Ipv4), libc::IPPROTO_RAW);
		assert_eq!(SocketType::Raw.protocol(Family::Ipv6), libc::IPPROTO_ICMPV6);
		assert_eq!(SocketType::Icmp.protocol(Family::Ipv4), libc::IPPROTO_ICMP);
		assert_eq!(SocketType::Icmp.protocol(Family::Ipv6), libc::IPPROTO_ICMPV6);
	}

	#[test]
	fn icmp_collapses_to_raw() {
		assert_eq!(SocketType::Icmp.raw(), libc::SOCK_RAW);
		assert_eq!(SocketType::Raw.raw(), libc::SOCK_RAW);
		assert!(SocketType::Icmp.is_raw());
		assert!(!SocketType::Datagram.is_raw());
	}

	#[test]
	#[should_panic(expected = "send failed")]
	fn or_die_panics_with_context() {
		let failed: std::io::Result<()> = Err(std::io::Error::other("boom"));
		or_die(failed, "send");
	}
}
