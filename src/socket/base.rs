use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use tracing::{debug, trace, warn};

use crate::addr::{Family, SockAddr, ToSockAddr};
use crate::error::{IoError, SocketError, errno};
use crate::host::Host;
use crate::packet::Packet;

use super::options;
use super::{SocketType, retry_eintr};

/// An open OS socket handle plus the family, kind and protocol it was
/// opened with.
///
/// Owns exactly one handle until [`destroy`](Socket::destroy) or drop.
/// After `destroy` every operation fails with [`IoError::Closed`].
#[derive(Debug)]
pub struct Socket {
	fd: Option<OwnedFd>,
	family: Family,
	kind: SocketType,
	protocol: libc::c_int,
}

/// Which of the two address-attaching syscalls a candidate walk performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attach {
	Bind,
	Connect,
}

impl Attach {
	fn name(self) -> &'static str {
		match self {
			Attach::Bind => "bind",
			Attach::Connect => "connect",
		}
	}

	fn call(self, fd: RawFd, addr: *const libc::sockaddr, len: libc::socklen_t) -> libc::c_int {
		unsafe {
			match self {
				Attach::Bind => libc::bind(fd, addr, len),
				Attach::Connect => libc::connect(fd, addr, len),
			}
		}
	}
}

impl Socket {
	/// Opens a socket of `kind` on `family` with the protocol from the
	/// protocol table. The handle is close-on-exec.
	pub fn open(kind: SocketType, family: Family) -> std::io::Result<Self> {
		let protocol = kind.protocol(family);
		let fd = unsafe { libc::socket(family.raw(), kind.raw() | libc::SOCK_CLOEXEC, protocol) };
		if fd == -1 {
			let errno = errno();
			warn!(%kind, %family, protocol, errno, "socket creation failed");
			return Err(SocketError::Create { errno, kind, family }.into());
		}

		debug!(fd, %kind, %family, protocol, "socket created");
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };
		Ok(Self::from_fd(fd, family, kind))
	}

	/// Wraps a handle the kernel handed out (accept, dup).
	pub(crate) fn from_fd(fd: OwnedFd, family: Family, kind: SocketType) -> Self {
		Self {
			fd: Some(fd),
			family,
			kind,
			protocol: kind.protocol(family),
		}
	}

	#[inline]
	pub fn family(&self) -> Family {
		self.family
	}

	#[inline]
	pub fn kind(&self) -> SocketType {
		self.kind
	}

	#[inline]
	pub fn protocol(&self) -> libc::c_int {
		self.protocol
	}

	#[inline]
	pub fn is_open(&self) -> bool {
		self.fd.is_some()
	}

	/// Closes the handle. Calling it again does nothing.
	pub fn destroy(&mut self) {
		if let Some(fd) = self.fd.take() {
			debug!(fd = fd.as_raw_fd(), kind = %self.kind, "socket closed");
		}
	}

	/// The live handle, or `Closed` once destroyed.
	pub(crate) fn checked_fd(&self) -> std::io::Result<BorrowedFd<'_>> {
		self.fd.as_ref().map(|fd| fd.as_fd()).ok_or_else(|| IoError::Closed.into())
	}

	/// A second close-on-exec handle to the same open socket.
	pub(crate) fn duplicate_fd(&self) -> std::io::Result<OwnedFd> {
		self.checked_fd()?.try_clone_to_owned()
	}

	pub fn set_send_buffer_size(&self, size: usize) -> std::io::Result<()> {
		options::set_send_buffer_size(&self.checked_fd()?, size)
	}

	pub fn set_recv_buffer_size(&self, size: usize) -> std::io::Result<()> {
		options::set_recv_buffer_size(&self.checked_fd()?, size)
	}

	pub fn send_buffer_size(&self) -> std::io::Result<usize> {
		options::send_buffer_size(&self.checked_fd()?)
	}

	pub fn recv_buffer_size(&self) -> std::io::Result<usize> {
		options::recv_buffer_size(&self.checked_fd()?)
	}

	/// The address the kernel bound this socket to (`getsockname`).
	pub fn local_addr(&self) -> std::io::Result<SockAddr> {
		let fd = self.checked_fd()?;
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
		let result = unsafe {
			libc::getsockname(fd.as_raw_fd(), &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
		};
		if result == -1 {
			return Err(SocketError::GetOption { errno: errno(), option: "getsockname" }.into());
		}
		SockAddr::from_storage(&storage, len)
			.ok_or_else(|| SocketError::InvalidAddress { reason: "local address of unknown family" }.into())
	}

	/// Binds to the first candidate of `host` that matches this socket's
	/// family. `port` is `None` for raw sockets.
	pub(crate) fn bind_host(&self, host: &Host, port: Option<u16>) -> std::io::Result<SockAddr> {
		self.attach_first(Attach::Bind, host, port)
	}

	/// Connects to the first candidate of `host` that accepts.
	pub(crate) fn connect_host(&self, host: &Host, port: Option<u16>) -> std::io::Result<SockAddr> {
		self.attach_first(Attach::Connect, host, port)
	}

	fn attach_first(&self, op: Attach, host: &Host, port: Option<u16>) -> std::io::Result<SockAddr> {
		let fd = self.checked_fd()?.as_raw_fd();
		let mut last_errno = None;

		for candidate in host.candidates() {
			if candidate.family() != self.family {
				debug!(op = op.name(), %candidate, family = %self.family, "skipping candidate of other family");
				continue;
			}
			let target = match port {
				Some(port) => candidate.with_port(port),
				None => *candidate,
			};

			let mut interrupted = false;
			let result = target
				.with_raw(|ptr, len| {
					retry_eintr(|| {
						let rv = op.call(fd, ptr, len);
						if rv == -1 && errno() == libc::EINTR {
							interrupted = true;
						}
						rv as isize
					})
				})
				.ok_or(SocketError::InvalidAddress { reason: "candidate has no raw form" })?;

			// an interrupted connect keeps going in the kernel; the retry
			// then reports the connection as already made
			let succeeded = result == 0
				|| (op == Attach::Connect && interrupted && errno() == libc::EISCONN);
			if succeeded {
				debug!(fd, op = op.name(), addr = %target, "attached");
				return Ok(target);
			}

			let errno = errno();
			warn!(fd, op = op.name(), addr = %target, errno, "candidate failed, trying next");
			last_errno = Some(errno);
		}

		Err(SocketError::NoCandidate {
			op: op.name(),
			host: host.original().to_owned(),
			family: self.family,
			errno: last_errno,
		}
		.into())
	}

	/// One `send(2)`. A short send is logged and returned as-is.
	pub(crate) fn send_packet(&self, packet: &Packet) -> std::io::Result<usize> {
		let fd = self.checked_fd()?.as_raw_fd();
		let data = packet.as_bytes();
		let n = retry_eintr(|| unsafe {
			libc::send(fd, data.as_ptr() as *const libc::c_void, data.len(), libc::MSG_NOSIGNAL)
		});
		self.finish_send(fd, n, data.len(), None)
	}

	/// One `sendto(2)` aimed at `addr`.
	pub(crate) fn send_packet_to(&self, packet: &Packet, addr: &SockAddr) -> std::io::Result<usize> {
		let fd = self.checked_fd()?.as_raw_fd();
		let data = packet.as_bytes();
		let n = addr
			.with_raw(|ptr, len| {
				retry_eintr(|| unsafe {
					libc::sendto(
						fd,
						data.as_ptr() as *const libc::c_void,
						data.len(),
						libc::MSG_NOSIGNAL,
						ptr,
						len,
					)
				})
			})
			.ok_or(SocketError::InvalidAddress { reason: "destination has no raw form" })?;
		self.finish_send(fd, n, data.len(), Some(addr))
	}

	fn finish_send(&self, fd: RawFd, n: isize, wanted: usize, to: Option<&SockAddr>) -> std::io::Result<usize> {
		if n == -1 {
			let errno = errno();
			warn!(fd, errno, to = ?to.map(|addr| addr.to_string()), "send failed");
			return Err(IoError::Write { errno }.into());
		}
		let sent = n as usize;
		if sent < wanted {
			debug!(fd, sent, wanted, "short send");
		} else {
			trace!(fd, sent, "sent");
		}
		Ok(sent)
	}

	/// One `recv(2)` of at most `count` bytes. A zero-byte read means the
	/// peer closed and yields an empty packet.
	pub(crate) fn recv_packet(&self, count: usize) -> std::io::Result<Packet> {
		if count == 0 {
			return Err(IoError::ZeroLength.into());
		}
		let fd = self.checked_fd()?.as_raw_fd();
		let mut buf = vec![0u8; count];
		let n = recv_into(fd, &mut buf);
		if n == -1 {
			let errno = errno();
			warn!(fd, errno, "receive failed");
			return Err(IoError::Read { errno }.into());
		}
		if n == 0 {
			warn!(fd, "peer closed, nothing received");
			return Ok(Packet::empty());
		}

		buf.truncate(n as usize);
		trace!(fd, received = n, wanted = count, "received");
		Ok(Packet::from(buf))
	}

	/// Reads until `count` bytes arrived or the peer closed.
	///
	/// An error after the first byte ends the read and returns what came in;
	/// an error before it is returned as-is.
	pub(crate) fn recv_exact(&self, count: usize) -> std::io::Result<Packet> {
		if count == 0 {
			return Err(IoError::ZeroLength.into());
		}
		let fd = self.checked_fd()?.as_raw_fd();
		let mut buf = vec![0u8; count];
		let mut filled = 0;

		while filled < count {
			let n = recv_into(fd, &mut buf[filled..]);
			if n == -1 {
				let errno = errno();
				if filled == 0 {
					warn!(fd, errno, "receive failed");
					return Err(IoError::Read { errno }.into());
				}
				warn!(fd, errno, filled, wanted = count, "receive failed mid-read, keeping partial data");
				break;
			}
			if n == 0 {
				debug!(fd, filled, wanted = count, "peer closed before the full count");
				break;
			}
			filled += n as usize;
		}

		buf.truncate(filled);
		Ok(Packet::from(buf))
	}

	/// One `recvfrom(2)`, returning the sender's address alongside the data.
	pub(crate) fn recv_packet_from(&self, count: usize) -> std::io::Result<(Packet, SockAddr)> {
		if count == 0 {
			return Err(IoError::ZeroLength.into());
		}
		let fd = self.checked_fd()?.as_raw_fd();
		let mut buf = vec![0u8; count];
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

		let n = retry_eintr(|| unsafe {
			libc::recvfrom(
				fd,
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				0,
				&mut storage as *mut _ as *mut libc::sockaddr,
				&mut len,
			)
		});
		if n == -1 {
			let errno = errno();
			warn!(fd, errno, "receive failed");
			return Err(IoError::Read { errno }.into());
		}

		let from = SockAddr::from_storage(&storage, len)
			.ok_or(SocketError::InvalidAddress { reason: "sender address of unknown family" })?;
		buf.truncate(n as usize);
		trace!(fd, received = n, %from, "received");
		Ok((Packet::from(buf), from))
	}
}

fn recv_into(fd: RawFd, buf: &mut [u8]) -> isize {
	retry_eintr(|| unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) })
}

impl AsRawFd for Socket {
	/// `-1` once destroyed.
	fn as_raw_fd(&self) -> RawFd {
		self.fd.as_ref().map_or(-1, |fd| fd.as_raw_fd())
	}
}

impl Drop for Socket {
	fn drop(&mut self) {
		self.destroy();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn destroy_is_idempotent_and_closes() {
		let mut socket = Socket::open(SocketType::Datagram, Family::Ipv4).unwrap();
		assert!(socket.is_open());
		assert!(socket.as_raw_fd() >= 0);

		socket.destroy();
		socket.destroy();
		assert!(!socket.is_open());
		assert_eq!(socket.as_raw_fd(), -1);

		let err = socket.send_packet(&Packet::from("x")).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
	}

	#[test]
	fn zero_length_receive_is_rejected() {
		let socket = Socket::open(SocketType::Datagram, Family::Ipv4).unwrap();
		let err = socket.recv_packet(0).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
	}

	#[test]
	fn records_kind_and_protocol() {
		let socket = Socket::open(SocketType::Stream, Family::Ipv4).unwrap();
		assert_eq!(socket.kind(), SocketType::Stream);
		assert_eq!(socket.family(), Family::Ipv4);
		assert_eq!(socket.protocol(), 0);
	}

	#[test]
	fn bind_skips_other_family_candidates() {
		let host = Host::resolve("127.0.0.1").unwrap();
		let socket = Socket::open(SocketType::Datagram, Family::Ipv6);
		let Ok(socket) = socket else { return };
		let err = socket.bind_host(&host, Some(0)).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::AddrNotAvailable);
	}

	#[test]
	fn bind_reports_local_address() {
		let host = Host::resolve("127.0.0.1").unwrap();
		let socket = Socket::open(SocketType::Datagram, Family::Ipv4).unwrap();
		socket.bind_host(&host, Some(0)).unwrap();
		let local = socket.local_addr().unwrap();
		assert_eq!(local.family(), Family::Ipv4);
		assert_ne!(local.port(), 0);
	}
}
