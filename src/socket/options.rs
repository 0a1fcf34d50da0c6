use std::os::fd::AsRawFd;
use std::time::Duration;

use tracing::{debug, error};

use crate::error::{SocketError, errno};
use crate::header::icmpv6;

/// `ICMP6_FILTER` from `<netinet/icmp6.h>` (level `IPPROTO_ICMPV6`).
const ICMP6_FILTER: libc::c_int = 1;

fn setsockopt<S: AsRawFd, T>(
	socket: &S,
	level: libc::c_int,
	name: libc::c_int,
	value: &T,
	option: &'static str,
) -> std::io::Result<()> {
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			level,
			name,
			value as *const T as *const libc::c_void,
			std::mem::size_of::<T>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option }.into())
	} else {
		Ok(())
	}
}

fn getsockopt_int<S: AsRawFd>(
	socket: &S,
	level: libc::c_int,
	name: libc::c_int,
	option: &'static str,
) -> std::io::Result<libc::c_int> {
	let mut val: libc::c_int = 0;
	let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
	let result = unsafe {
		libc::getsockopt(
			socket.as_raw_fd(),
			level,
			name,
			&mut val as *mut _ as *mut libc::c_void,
			&mut len,
		)
	};
	if result == -1 {
		Err(SocketError::GetOption { errno: errno(), option }.into())
	} else {
		Ok(val)
	}
}

/// Sets SO_REUSEADDR on a socket.
///
/// Allows binding to an address that's in TIME_WAIT state.
/// Essential for server restarts.
pub fn set_reuse_addr<S: AsRawFd>(socket: &S, enable: bool) -> std::io::Result<()> {
	let val: libc::c_int = if enable { 1 } else { 0 };
	setsockopt(socket, libc::SOL_SOCKET, libc::SO_REUSEADDR, &val, "SO_REUSEADDR")
}

/// Requests a send buffer of at least `size` bytes (SO_SNDBUF).
///
/// The kernel rounds the request (Linux doubles it, then clamps to
/// `wmem_max`). The negotiated size is read back and anything smaller than
/// `size` is reported as `BufferTooSmall`, even though setsockopt succeeded.
pub fn set_send_buffer_size<S: AsRawFd>(socket: &S, size: usize) -> std::io::Result<()> {
	set_buffer_size(socket, libc::SO_SNDBUF, "SO_SNDBUF", size)
}

/// Requests a receive buffer of at least `size` bytes (SO_RCVBUF).
///
/// Same negotiation rules as [`set_send_buffer_size`].
pub fn set_recv_buffer_size<S: AsRawFd>(socket: &S, size: usize) -> std::io::Result<()> {
	set_buffer_size(socket, libc::SO_RCVBUF, "SO_RCVBUF", size)
}

/// Current send buffer size as reported by the kernel.
pub fn send_buffer_size<S: AsRawFd>(socket: &S) -> std::io::Result<usize> {
	getsockopt_int(socket, libc::SOL_SOCKET, libc::SO_SNDBUF, "SO_SNDBUF").map(|val| val as usize)
}

/// Current receive buffer size as reported by the kernel.
pub fn recv_buffer_size<S: AsRawFd>(socket: &S) -> std::io::Result<usize> {
	getsockopt_int(socket, libc::SOL_SOCKET, libc::SO_RCVBUF, "SO_RCVBUF").map(|val| val as usize)
}

fn set_buffer_size<S: AsRawFd>(
	socket: &S,
	name: libc::c_int,
	option: &'static str,
	size: usize,
) -> std::io::Result<()> {
	let val = match libc::c_int::try_from(size) {
		Ok(val) if val > 0 => val,
		_ => return Err(SocketError::SetOption { errno: libc::EINVAL, option }.into()),
	};
	setsockopt(socket, libc::SOL_SOCKET, name, &val, option)?;

	let actual = getsockopt_int(socket, libc::SOL_SOCKET, name, option)? as usize;
	if actual < size {
		error!(option, requested = size, actual, "kernel allocated a smaller buffer");
		return Err(SocketError::BufferTooSmall { option, requested: size, actual }.into());
	}
	debug!(option, requested = size, actual, "buffer resized");
	Ok(())
}

fn timeval_from(timeout: Option<Duration>) -> libc::timeval {
	match timeout {
		// zero means "block forever" to the kernel
		None => libc::timeval { tv_sec: 0, tv_usec: 0 },
		Some(timeout) => libc::timeval {
			tv_sec: timeout.as_secs() as libc::time_t,
			tv_usec: timeout.subsec_micros() as libc::suseconds_t,
		},
	}
}

/// Sets SO_SNDTIMEO. `None` blocks forever.
pub fn set_send_timeout<S: AsRawFd>(socket: &S, timeout: Option<Duration>) -> std::io::Result<()> {
	let val = timeval_from(timeout);
	setsockopt(socket, libc::SOL_SOCKET, libc::SO_SNDTIMEO, &val, "SO_SNDTIMEO")
}

/// Sets SO_RCVTIMEO. `None` blocks forever.
pub fn set_recv_timeout<S: AsRawFd>(socket: &S, timeout: Option<Duration>) -> std::io::Result<()> {
	let val = timeval_from(timeout);
	setsockopt(socket, libc::SOL_SOCKET, libc::SO_RCVTIMEO, &val, "SO_RCVTIMEO")
}

/// Sets IP_HDRINCL on an IPv4 raw socket.
///
/// With it enabled, outgoing packets must start with a caller-built IPv4
/// header instead of one synthesized by the kernel.
pub fn set_ip_hdrincl<S: AsRawFd>(socket: &S, enable: bool) -> std::io::Result<()> {
	let val: libc::c_int = if enable { 1 } else { 0 };
	setsockopt(socket, libc::IPPROTO_IP, libc::IP_HDRINCL, &val, "IP_HDRINCL")
}

/// Installs an ICMPv6 type filter (ICMP6_FILTER) on an ICMPv6 raw socket.
pub fn set_icmpv6_filter<S: AsRawFd>(socket: &S, filter: &Icmpv6Filter) -> std::io::Result<()> {
	setsockopt(socket, libc::IPPROTO_ICMPV6, ICMP6_FILTER, filter, "ICMP6_FILTER")
}

/// Which ICMPv6 message types a raw socket gets to see.
///
/// Mirrors `struct icmp6_filter`: 256 bits, one per message type, where a
/// set bit blocks the type (Linux semantics).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Icmpv6Filter {
	data: [u32; 8],
}

impl Icmpv6Filter {
	pub fn pass_all() -> Self {
		Self { data: [0; 8] }
	}

	pub fn block_all() -> Self {
		Self { data: [u32::MAX; 8] }
	}

	pub fn pass(mut self, kind: u8) -> Self {
		self.data[(kind >> 5) as usize] &= !(1u32 << (kind & 31));
		self
	}

	pub fn block(mut self, kind: u8) -> Self {
		self.data[(kind >> 5) as usize] |= 1u32 << (kind & 31);
		self
	}

	pub fn passes(&self, kind: u8) -> bool {
		self.data[(kind >> 5) as usize] & (1u32 << (kind & 31)) == 0
	}

	/// The allow-list raw ICMPv6 sockets are opened with: echo replies,
	/// time exceeded and destination unreachable. Everything else is dropped
	/// by the kernel.
	pub fn probe_replies() -> Self {
		Self::block_all()
			.pass(icmpv6::ECHO_REPLY)
			.pass(icmpv6::TIME_EXCEEDED)
			.pass(icmpv6::DEST_UNREACH)
	}
}
