use std::os::fd::{AsRawFd, RawFd};

use tracing::{debug, trace};

use crate::addr::Family;
use crate::error::SocketError;
use crate::host::Host;
use crate::packet::Packet;

use super::options::{Icmpv6Filter, set_icmpv6_filter, set_ip_hdrincl};
use super::{Socket, SocketType, Transport, or_die};

/// A raw IP (IPv4) or ICMPv6 (IPv6) socket for hand-built probes.
///
/// Opening one usually needs `CAP_NET_RAW`; without it creation fails with
/// `PermissionDenied`. IPv6 sockets only ever see echo replies, time
/// exceeded and destination unreachable messages.
#[derive(Debug)]
pub struct RawSocket {
	socket: Socket,
}

/*
  IPv4 receive layout (kernel keeps the IP header):

  ┌──────────────────────┬──────────────────┬──────────────┐
  │ IPv4 header (IHL*4)  │ ICMP header (8)  │   payload    │
  └──────────────────────┴──────────────────┴──────────────┘

  IPv6 receive layout (kernel strips the IPv6 header):

  ┌──────────────────┬──────────────┐
  │ ICMPv6 header(8) │   payload    │
  └──────────────────┴──────────────┘
*/

impl RawSocket {
	/// Raw IPv4.
	pub fn create_default() -> std::io::Result<Self> {
		Self::create(SocketType::Raw, Family::Ipv4)
	}

	/// Opens a `Raw` or `Icmp` socket of `family`.
	///
	/// On IPv6 the ICMPv6 filter is installed before the socket is
	/// returned; if that fails, so does creation.
	pub fn create(kind: SocketType, family: Family) -> std::io::Result<Self> {
		if !kind.is_raw() {
			return Err(SocketError::Unsupported { kind, role: "raw socket" }.into());
		}

		let socket = Socket::open(kind, family)?;
		if family == Family::Ipv6 {
			set_icmpv6_filter(&socket.checked_fd()?, &Icmpv6Filter::probe_replies())?;
			debug!(fd = socket.as_raw_fd(), "ICMPv6 filter installed");
		}
		Ok(Self { socket })
	}

	/// # Panics
	/// If [`create`](Self::create) fails.
	pub fn create_or_die(kind: SocketType, family: Family) -> Self {
		or_die(Self::create(kind, family), format_args!("open {kind} {family} socket"))
	}

	/// Tells the kernel outgoing IPv4 packets carry their own IP header.
	/// IPv6 has no such option; the call succeeds and does nothing.
	pub fn set_header_included(&self) -> std::io::Result<()> {
		match self.socket.family() {
			Family::Ipv4 => set_ip_hdrincl(&self.socket.checked_fd()?, true),
			Family::Ipv6 => {
				debug!(fd = self.socket.as_raw_fd(), "header inclusion ignored on IPv6");
				Ok(())
			}
		}
	}

	/// Binds to the first candidate of `host` matching this socket's family.
	pub fn bind(&self, host: &Host) -> std::io::Result<()> {
		self.socket.bind_host(host, None).map(|_| ())
	}

	/// Fixes the destination for [`Transport::send`].
	pub fn connect(&self, host: &Host) -> std::io::Result<()> {
		self.socket.connect_host(host, None).map(|_| ())
	}

	/// Sends `packet` to the first candidate of `host` in this socket's
	/// family. Fails with `NoCandidate` if the host has none.
	pub fn send_to(&self, host: &Host, packet: &Packet) -> std::io::Result<usize> {
		let family = self.socket.family();
		let Some(target) = host.candidates_for(family).next() else {
			return Err(SocketError::NoCandidate {
				op: "send_to",
				host: host.original().to_owned(),
				family,
				errno: None,
			}
			.into());
		};
		trace!(fd = self.socket.as_raw_fd(), %target, len = packet.len(), "raw send");
		self.socket.send_packet_to(packet, &target)
	}

	/// # Panics
	/// If [`send_to`](Self::send_to) fails.
	pub fn send_to_or_die(&self, host: &Host, packet: &Packet) -> usize {
		or_die(self.send_to(host, packet), format_args!("send to {host}"))
	}

	/// Receives at most `count` bytes and reports who sent them.
	///
	/// The sender comes back as a [`Host`] resolved from its numeric form,
	/// so no DNS is involved.
	pub fn receive_from(&mut self, count: usize) -> std::io::Result<(Packet, Host)> {
		let (packet, from) = self.socket.recv_packet_from(count)?;
		let sender = Host::resolve(&from.ip().to_string())?;
		Ok((packet, sender))
	}

	/// # Panics
	/// If [`receive_from`](Self::receive_from) fails.
	pub fn receive_from_or_die(&mut self, count: usize) -> (Packet, Host) {
		or_die(self.receive_from(count), "raw receive")
	}

	pub fn socket(&self) -> &Socket {
		&self.socket
	}

	pub fn socket_mut(&mut self) -> &mut Socket {
		&mut self.socket
	}
}

impl Transport for RawSocket {
	fn send(&self, packet: &Packet) -> std::io::Result<usize> {
		self.socket.send_packet(packet)
	}

	fn receive(&mut self, count: usize) -> std::io::Result<Packet> {
		self.socket.recv_packet(count)
	}
}

impl AsRawFd for RawSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.socket.as_raw_fd()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stream_kind_is_not_raw() {
		let err = RawSocket::create(SocketType::Stream, Family::Ipv4).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
	}
}
