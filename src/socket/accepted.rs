use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use tracing::{debug, trace};

use crate::addr::SockAddr;
use crate::error::IoError;
use crate::packet::Packet;

use super::{Socket, SocketType, Transport};

/// The server side of one conversation, handed out by
/// [`ListenSocket::accept`](super::ListenSocket::accept).
///
/// Stream: owns the connected peer handle. Datagram: owns a duplicate of
/// the listening handle and talks to whoever sent the last datagram.
/// Either way a duplicate of the listening handle is kept and closed along
/// with the peer handle.
#[derive(Debug)]
pub struct AcceptedSocket {
	socket: Socket,
	listener: OwnedFd,
	peer: Option<SockAddr>,
}

impl AcceptedSocket {
	pub(crate) fn new(socket: Socket, listener: OwnedFd, peer: Option<SockAddr>) -> Self {
		Self { socket, listener, peer }
	}

	/// The remote end: the connected peer for streams, the sender of the
	/// most recent datagram otherwise (`None` before the first receive).
	pub fn peer(&self) -> Option<SockAddr> {
		self.peer
	}

	pub fn socket(&self) -> &Socket {
		&self.socket
	}

	fn is_stream(&self) -> bool {
		self.socket.kind() == SocketType::Stream
	}
}

impl Transport for AcceptedSocket {
	fn send(&self, packet: &Packet) -> std::io::Result<usize> {
		if self.is_stream() {
			return self.socket.send_packet(packet);
		}
		let peer = self.peer.ok_or(IoError::NoPeer)?;
		self.socket.send_packet_to(packet, &peer)
	}

	/// Datagram: every call records the sender as the new peer.
	fn receive(&mut self, count: usize) -> std::io::Result<Packet> {
		if self.is_stream() {
			return self.socket.recv_packet(count);
		}
		let (packet, from) = self.socket.recv_packet_from(count)?;
		if self.peer != Some(from) {
			debug!(fd = self.socket.as_raw_fd(), peer = %from, "datagram peer recorded");
		}
		self.peer = Some(from);
		Ok(packet)
	}
}

impl AsRawFd for AcceptedSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.socket.as_raw_fd()
	}
}

impl Drop for AcceptedSocket {
	fn drop(&mut self) {
		// listener duplicate closes when the field drops
		trace!(
			fd = self.socket.as_raw_fd(),
			listener = self.listener.as_raw_fd(),
			"closing accepted socket"
		);
	}
}
