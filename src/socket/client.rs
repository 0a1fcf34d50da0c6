use std::os::fd::{AsRawFd, RawFd};

use crate::addr::Family;
use crate::host::Host;
use crate::packet::Packet;

use super::{ClientBuilder, Socket, SocketType, Transport, or_die};

/// A connected stream or datagram socket on the initiating side.
///
/// Built by connecting to the first candidate of a resolved host that
/// accepts; optionally bound to a local endpoint first.
#[derive(Debug)]
pub struct ClientSocket {
	socket: Socket,
}

impl ClientSocket {
	pub(crate) fn from_socket(socket: Socket) -> Self {
		Self { socket }
	}

	/// Stream client over IPv4, the common case.
	pub fn connect(host: &Host, port: u16) -> std::io::Result<Self> {
		Self::create(host, port, SocketType::Stream, Family::Ipv4)
	}

	/// Connects a `kind` socket of `family` to `host`:`port`.
	///
	/// Candidates of the other family are skipped. Raw kinds are rejected
	/// with `Unsupported`; use [`RawSocket`](super::RawSocket) for those.
	pub fn create(host: &Host, port: u16, kind: SocketType, family: Family) -> std::io::Result<Self> {
		ClientBuilder::new(kind, family).connect(host, port)
	}

	/// Binds to `bind_host`:`bind_port`, then connects to
	/// `connect_host`:`connect_port`.
	pub fn create_bound(
		bind_host: &Host,
		bind_port: u16,
		connect_host: &Host,
		connect_port: u16,
		kind: SocketType,
		family: Family,
	) -> std::io::Result<Self> {
		ClientBuilder::new(kind, family)
			.bind(bind_host, bind_port)
			.connect(connect_host, connect_port)
	}

	/// # Panics
	/// If [`create`](Self::create) fails.
	pub fn create_or_die(host: &Host, port: u16, kind: SocketType, family: Family) -> Self {
		or_die(Self::create(host, port, kind, family), format_args!("connect to {host}:{port}"))
	}

	/// # Panics
	/// If [`create_bound`](Self::create_bound) fails.
	pub fn create_bound_or_die(
		bind_host: &Host,
		bind_port: u16,
		connect_host: &Host,
		connect_port: u16,
		kind: SocketType,
		family: Family,
	) -> Self {
		or_die(
			Self::create_bound(bind_host, bind_port, connect_host, connect_port, kind, family),
			format_args!("bind to {bind_host}:{bind_port} and connect to {connect_host}:{connect_port}"),
		)
	}

	/// Reads until exactly `count` bytes arrived or the peer closed.
	///
	/// Shorter results mean the peer closed, or an error cut the read short
	/// after some data had already arrived.
	pub fn receive_exact(&mut self, count: usize) -> std::io::Result<Packet> {
		self.socket.recv_exact(count)
	}

	pub fn socket(&self) -> &Socket {
		&self.socket
	}

	pub fn socket_mut(&mut self) -> &mut Socket {
		&mut self.socket
	}
}

impl Transport for ClientSocket {
	fn send(&self, packet: &Packet) -> std::io::Result<usize> {
		self.socket.send_packet(packet)
	}

	fn receive(&mut self, count: usize) -> std::io::Result<Packet> {
		self.socket.recv_packet(count)
	}
}

impl AsRawFd for ClientSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.socket.as_raw_fd()
	}
}
