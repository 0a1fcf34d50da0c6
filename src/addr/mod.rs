//! Address families and socket address records.
//!
//! - `Family`: IPv4 or IPv6, fixed per socket
//! - `SocketAddrV4` / `SocketAddrV6`: kernel-facing address records
//! - `SockAddr`: either of the two, as produced by host resolution

mod ipv4;
mod ipv6;
pub use self::ipv4::SocketAddrV4;
pub use self::ipv6::SocketAddrV6;

use std::fmt;
use std::net::IpAddr;

/// Address family of a socket or a resolved address.
///
/// There is no "unspecified" variant: a socket always has a concrete family,
/// and literal classification reports an unknown family as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
	Ipv4,
	Ipv6,
}

impl Family {
	/// Returns the libc constant for this address family.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Family::Ipv4 => libc::AF_INET,
			Family::Ipv6 => libc::AF_INET6,
		}
	}

	pub(crate) fn from_raw(raw: libc::c_int) -> Option<Self> {
		match raw {
			libc::AF_INET => Some(Family::Ipv4),
			libc::AF_INET6 => Some(Family::Ipv6),
			_ => None,
		}
	}
}

impl fmt::Display for Family {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Family::Ipv4 => f.write_str("IPv4"),
			Family::Ipv6 => f.write_str("IPv6"),
		}
	}
}

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	/// Returns None if the address cannot be expressed as a sockaddr.
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}

/// Trait for address types that can be created from raw sockaddr.
pub trait FromSockAddr: Sized {
	/// Creates address from raw sockaddr storage.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes.
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self>;
}

impl FromSockAddr for SocketAddrV4 {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t {
			return None;
		}
		let raw = unsafe { &*(addr as *const libc::sockaddr_in) };
		if raw.sin_family != libc::AF_INET as libc::sa_family_t {
			return None;
		}
		Some(Self::from_raw(raw))
	}
}

impl FromSockAddr for SocketAddrV6 {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t {
			return None;
		}
		let raw = unsafe { &*(addr as *const libc::sockaddr_in6) };
		if raw.sin6_family != libc::AF_INET6 as libc::sa_family_t {
			return None;
		}
		Some(Self::from_raw(raw))
	}
}

/// One candidate endpoint: an IPv4 or IPv6 address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SockAddr {
	V4(SocketAddrV4),
	V6(SocketAddrV6),
}

impl SockAddr {
	/// The wildcard address of `family` on `port`.
	pub fn unspecified(family: Family, port: u16) -> Self {
		match family {
			Family::Ipv4 => SockAddr::V4(SocketAddrV4::unspecified(port)),
			Family::Ipv6 => SockAddr::V6(SocketAddrV6::unspecified(port)),
		}
	}

	pub fn family(&self) -> Family {
		match self {
			SockAddr::V4(_) => Family::Ipv4,
			SockAddr::V6(_) => Family::Ipv6,
		}
	}

	pub fn port(&self) -> u16 {
		match self {
			SockAddr::V4(addr) => addr.port(),
			SockAddr::V6(addr) => addr.port(),
		}
	}

	/// Returns a copy with the port replaced. Candidates are shared,
	/// so the port is set on a copy rather than in place.
	pub fn with_port(self, port: u16) -> Self {
		match self {
			SockAddr::V4(addr) => SockAddr::V4(addr.with_port(port)),
			SockAddr::V6(addr) => SockAddr::V6(addr.with_port(port)),
		}
	}

	pub fn ip(&self) -> IpAddr {
		match self {
			SockAddr::V4(addr) => IpAddr::V4(addr.ip_addr()),
			SockAddr::V6(addr) => IpAddr::V6(addr.ip_addr()),
		}
	}
}

impl fmt::Display for SockAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SockAddr::V4(addr) => write!(f, "{}:{}", addr.ip_addr(), addr.port()),
			SockAddr::V6(addr) => write!(f, "[{}]:{}", addr.ip_addr(), addr.port()),
		}
	}
}

impl From<std::net::SocketAddr> for SockAddr {
	fn from(addr: std::net::SocketAddr) -> Self {
		match addr {
			std::net::SocketAddr::V4(addr) => SockAddr::V4(addr.into()),
			std::net::SocketAddr::V6(addr) => SockAddr::V6(addr.into()),
		}
	}
}

impl ToSockAddr for SockAddr {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			SockAddr::V4(addr) => addr.with_raw(f),
			SockAddr::V6(addr) => addr.with_raw(f),
		}
	}
}

impl FromSockAddr for SockAddr {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sa_family_t>() as libc::socklen_t {
			return None;
		}
		let family = unsafe { (*addr).sa_family } as libc::c_int;
		match Family::from_raw(family)? {
			Family::Ipv4 => unsafe { SocketAddrV4::from_sockaddr(addr, len) }.map(SockAddr::V4),
			Family::Ipv6 => unsafe { SocketAddrV6::from_sockaddr(addr, len) }.map(SockAddr::V6),
		}
	}
}

impl SockAddr {
	/// Reads an address the kernel wrote into `storage`.
	pub(crate) fn from_storage(storage: &libc::sockaddr_storage, len: libc::socklen_t) -> Option<Self> {
		unsafe { Self::from_sockaddr(storage as *const _ as *const libc::sockaddr, len) }
	}
}
