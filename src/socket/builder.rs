use std::os::fd::AsRawFd;
use std::time::Duration;

use tracing::debug;

use crate::addr::Family;
use crate::error::SocketError;
use crate::host::Host;

use super::{
	ClientSocket, Socket, SocketType,
	set_recv_buffer_size, set_recv_timeout, set_reuse_addr, set_send_buffer_size, set_send_timeout,
};

/// Send/receive timeout a listening socket starts with.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Shared Configuration Structs
// ============================================================================

/// Buffer size configuration.
///
/// Every size set here is checked against what the kernel actually
/// allocated; see [`set_send_buffer_size`](super::set_send_buffer_size).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferConfig {
	pub recv: Option<usize>,
	pub send: Option<usize>,
}

impl BufferConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn recv(mut self, size: usize) -> Self {
		self.recv = Some(size);
		self
	}

	pub fn send(mut self, size: usize) -> Self {
		self.send = Some(size);
		self
	}

	pub fn both(mut self, size: usize) -> Self {
		self.recv = Some(size);
		self.send = Some(size);
		self
	}

	pub(crate) fn apply<S: AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		if let Some(size) = self.recv {
			set_recv_buffer_size(socket, size)?;
		}
		if let Some(size) = self.send {
			set_send_buffer_size(socket, size)?;
		}
		Ok(())
	}
}

// ============================================================================
// Listen Configuration
// ============================================================================

/// How a [`ListenSocket`](super::ListenSocket) is set up before it binds.
///
/// # Example
/// ```ignore
/// use duallane::{Family, ListenConfig, ListenSocket, SocketType};
///
/// let config = ListenConfig::new().timeout(None).backlog(16);
/// let listener = ListenSocket::with_config(0, SocketType::Stream, Family::Ipv4, config)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenConfig {
	pub timeout: Option<Duration>,
	pub reuse_addr: bool,
	pub backlog: i32,
	pub buffers: BufferConfig,
}

impl Default for ListenConfig {
	fn default() -> Self {
		Self {
			timeout: Some(DEFAULT_TIMEOUT),
			reuse_addr: true,
			backlog: 1,
			buffers: BufferConfig::default(),
		}
	}
}

impl ListenConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Send and receive timeout. `None` blocks forever.
	pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn reuse_addr(mut self, enable: bool) -> Self {
		self.reuse_addr = enable;
		self
	}

	/// Listen backlog for stream sockets. Default: 1.
	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	pub(crate) fn apply<S: AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		set_send_timeout(socket, self.timeout)?;
		set_recv_timeout(socket, self.timeout)?;
		if self.reuse_addr {
			set_reuse_addr(socket, true)?;
		}
		self.buffers.apply(socket)
	}
}

// ============================================================================
// Client Builder
// ============================================================================

/// Builder for connected stream and datagram clients.
///
/// # Example
/// ```ignore
/// use duallane::{BufferConfig, ClientBuilder, Family, Host, SocketType};
///
/// let local = Host::resolve("127.0.0.1")?;
/// let remote = Host::resolve("127.0.0.1")?;
/// let client = ClientBuilder::new(SocketType::Datagram, Family::Ipv4)
///     .bind(&local, 0)
///     .buffers(BufferConfig::new().recv(65536))
///     .connect(&remote, 5353)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ClientBuilder<'a> {
	kind: SocketType,
	family: Family,
	bind: Option<(&'a Host, u16)>,
	buffers: BufferConfig,
}

impl<'a> ClientBuilder<'a> {
	pub fn new(kind: SocketType, family: Family) -> Self {
		Self {
			kind,
			family,
			bind: None,
			buffers: BufferConfig::default(),
		}
	}

	/// Bind to `host`:`port` before connecting.
	pub fn bind(mut self, host: &'a Host, port: u16) -> Self {
		self.bind = Some((host, port));
		self
	}

	pub fn buffers(mut self, config: BufferConfig) -> Self {
		self.buffers = config;
		self
	}

	/// Opens the socket, applies the configuration and connects to the
	/// first candidate of `host` that accepts.
	pub fn connect(self, host: &Host, port: u16) -> std::io::Result<ClientSocket> {
		if !matches!(self.kind, SocketType::Stream | SocketType::Datagram) {
			return Err(SocketError::Unsupported { kind: self.kind, role: "client" }.into());
		}

		let socket = Socket::open(self.kind, self.family)?;
		self.buffers.apply(&socket.checked_fd()?)?;

		if let Some((bind_host, bind_port)) = self.bind {
			let local = socket.bind_host(bind_host, Some(bind_port))?;
			debug!(fd = socket.as_raw_fd(), %local, "client bound");
		}
		let remote = socket.connect_host(host, Some(port))?;
		debug!(fd = socket.as_raw_fd(), %remote, kind = %self.kind, "client connected");

		Ok(ClientSocket::from_socket(socket))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn listen_defaults() {
		let config = ListenConfig::default();
		assert_eq!(config.timeout, Some(Duration::from_secs(5)));
		assert!(config.reuse_addr);
		assert_eq!(config.backlog, 1);
		assert_eq!(config.buffers, BufferConfig::default());
	}

	#[test]
	fn buffer_config_both() {
		let config = BufferConfig::new().both(8192);
		assert_eq!(config.recv, Some(8192));
		assert_eq!(config.send, Some(8192));
	}

	#[test]
	fn raw_kinds_are_not_clients() {
		let host = Host::resolve("127.0.0.1").unwrap();
		let err = ClientBuilder::new(SocketType::Icmp, Family::Ipv4).connect(&host, 7).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
	}
}
