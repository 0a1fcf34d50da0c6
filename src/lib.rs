//! Dual-stack (IPv4/IPv6) sockets for network measurement tools.
//!
//! Resolve a [`Host`] once, then open a [`ClientSocket`], [`ListenSocket`]
//! or [`RawSocket`] against it; every bind and connect walks the host's
//! candidates in order and keeps the first that works. Payloads travel as
//! [`Packet`]s, and hand-built probes use the wire headers in [`header`].
//!
//! Logging goes through `tracing`; no subscriber is installed here.

pub mod header;
pub mod socket;
mod addr;
mod error;
mod host;
mod packet;

pub use self::addr::{Family, FromSockAddr, SockAddr, SocketAddrV4, SocketAddrV6, ToSockAddr};
pub use self::error::{IoError, SocketError, errno};
pub use self::host::{Host, family_for_literal};
pub use self::packet::Packet;
pub use self::socket::{
	AcceptedSocket, BufferConfig, ClientBuilder, ClientSocket, DEFAULT_TIMEOUT, Icmpv6Filter,
	ListenConfig, ListenSocket, RawSocket, Socket, SocketType, Transport,
};
