//! Host resolution into candidate endpoints.

use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::fmt;

use tracing::{debug, warn};

use crate::addr::{Family, SockAddr};
use crate::error::{SocketError, errno_to_str};

/// A resolved host: the input it was built from, the distinct textual
/// addresses it resolved to, and one address record per resolver result.
///
/// Candidate order is the resolver's order; bind/connect walk it front to
/// back and stop at the first success. Ports on candidates are always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
	original: String,
	resolved: BTreeSet<String>,
	candidates: Vec<SockAddr>,
}

impl Host {
	/// Resolves a hostname or a numeric literal, IPv4 and IPv6 alike.
	///
	/// Any resolver error fails the whole resolution. A literal resolves to
	/// one address but typically several candidates, one per transport
	/// protocol the resolver reports.
	pub fn resolve(input: &str) -> std::io::Result<Self> {
		let list = AddrInfoList::lookup(input, 0)?;

		let mut resolved = BTreeSet::new();
		let mut candidates = Vec::new();
		for info in list.iter() {
			let Some(addr) = info.sock_addr() else {
				warn!(host = input, family = info.ai_family, "skipping record of unexpected family");
				continue;
			};
			let text = addr.ip().to_string();
			if resolved.insert(text.clone()) {
				debug!(host = input, addr = %text, "resolved");
			}
			candidates.push(addr.with_port(0));
		}

		if candidates.is_empty() {
			return Err(SocketError::Resolve {
				host: input.to_owned(),
				reason: "no usable addresses".into(),
			}
			.into());
		}

		Ok(Self {
			original: input.to_owned(),
			resolved,
			candidates,
		})
	}

	/// The string this host was resolved from.
	pub fn original(&self) -> &str {
		&self.original
	}

	/// Distinct addresses in text form, IPv4 and IPv6 mixed.
	pub fn resolved(&self) -> &BTreeSet<String> {
		&self.resolved
	}

	/// Every address record, in resolver order.
	pub fn candidates(&self) -> &[SockAddr] {
		&self.candidates
	}

	/// Candidates of one family, in resolver order.
	pub fn candidates_for(&self, family: Family) -> impl Iterator<Item = SockAddr> + '_ {
		self.candidates.iter().copied().filter(move |addr| addr.family() == family)
	}
}

impl fmt::Display for Host {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.original)
	}
}

/// Classifies a numeric address literal without touching DNS.
///
/// Returns `None` for anything that is not an IPv4 or IPv6 literal,
/// hostnames included.
pub fn family_for_literal(text: &str) -> Option<Family> {
	match AddrInfoList::lookup(text, libc::AI_NUMERICHOST) {
		Ok(list) => list.iter().next().and_then(|info| Family::from_raw(info.ai_family)),
		Err(err) => {
			debug!(input = text, error = %err, "not a numeric address");
			None
		}
	}
}

/// Owns a `getaddrinfo` result list and frees it on drop.
struct AddrInfoList {
	head: *mut libc::addrinfo,
}

impl AddrInfoList {
	fn lookup(node: &str, flags: libc::c_int) -> std::io::Result<Self> {
		let c_node = CString::new(node).map_err(|_| SocketError::InvalidAddress {
			reason: "host contains a NUL byte",
		})?;

		let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
		hints.ai_family = libc::AF_UNSPEC;
		hints.ai_socktype = 0;
		hints.ai_protocol = 0;
		hints.ai_flags = flags;

		let mut head: *mut libc::addrinfo = std::ptr::null_mut();
		let rv = unsafe { libc::getaddrinfo(c_node.as_ptr(), std::ptr::null(), &hints, &mut head) };
		if rv != 0 {
			let reason = if rv == libc::EAI_SYSTEM {
				errno_to_str(crate::error::errno())
			} else {
				unsafe { CStr::from_ptr(libc::gai_strerror(rv)) }.to_string_lossy().into_owned()
			};
			return Err(SocketError::Resolve { host: node.to_owned(), reason }.into());
		}

		Ok(Self { head })
	}

	fn iter(&self) -> impl Iterator<Item = &libc::addrinfo> {
		let mut next = self.head;
		std::iter::from_fn(move || {
			if next.is_null() {
				return None;
			}
			// the list stays alive as long as &self
			let info = unsafe { &*next };
			next = info.ai_next;
			Some(info)
		})
	}
}

impl Drop for AddrInfoList {
	fn drop(&mut self) {
		if !self.head.is_null() {
			unsafe { libc::freeaddrinfo(self.head) };
		}
	}
}

trait AddrInfoExt {
	fn sock_addr(&self) -> Option<SockAddr>;
}

impl AddrInfoExt for libc::addrinfo {
	fn sock_addr(&self) -> Option<SockAddr> {
		use crate::addr::FromSockAddr;
		if self.ai_addr.is_null() {
			return None;
		}
		unsafe { SockAddr::from_sockaddr(self.ai_addr, self.ai_addrlen) }
	}
}
