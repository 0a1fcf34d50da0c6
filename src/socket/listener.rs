use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::addr::{Family, SockAddr, ToSockAddr};
use crate::error::{SocketError, errno};

use super::{AcceptedSocket, ListenConfig, Socket, SocketType, or_die, retry_eintr};

/// A server-side socket bound to the wildcard address of its family.
///
/// Stream listeners are in the listening state; datagram listeners are
/// simply bound. Neither can send or receive: call
/// [`accept`](Self::accept) and talk through the [`AcceptedSocket`].
#[derive(Debug)]
pub struct ListenSocket {
    socket: Socket,
}

impl ListenSocket {
    /// Opens a `kind` socket of `family` and binds it to the wildcard
    /// address on `port`, with the defaults of [`ListenConfig`]: 5 s send
    /// and receive timeouts, address reuse, backlog 1.
    ///
    /// Port 0 lets the kernel pick; read it back with
    /// [`local_port`](Self::local_port).
    pub fn create(port: u16, kind: SocketType, family: Family) -> std::io::Result<Self> {
        Self::with_config(port, kind, family, ListenConfig::default())
    }

    /// Like [`create`](Self::create) with the setup taken from `config`.
    pub fn with_config(
        port: u16,
        kind: SocketType,
        family: Family,
        config: ListenConfig,
    ) -> std::io::Result<Self> {
        if !matches!(kind, SocketType::Stream | SocketType::Datagram) {
            return Err(SocketError::Unsupported { kind, role: "listener" }.into());
        }

        let socket = Socket::open(kind, family)?;
        config.apply(&socket.checked_fd()?)?;

        let addr = SockAddr::unspecified(family, port);
        let fd = socket.checked_fd()?.as_raw_fd();
        let result = addr
            .with_raw(|ptr, len| unsafe { libc::bind(fd, ptr, len) })
            .ok_or(SocketError::InvalidAddress { reason: "wildcard address has no raw form" })?;
        if result == -1 {
            let errno = errno();
            warn!(fd, %addr, errno, "listener bind failed");
            return Err(SocketError::Bind { errno, addr: addr.to_string() }.into());
        }

        if kind == SocketType::Stream {
            let result = unsafe { libc::listen(fd, config.backlog) };
            if result == -1 {
                let errno = errno();
                warn!(fd, backlog = config.backlog, errno, "listen failed");
                return Err(SocketError::Listen { errno, backlog: config.backlog }.into());
            }
        }

        info!(fd, %addr, %kind, "listening");
        Ok(Self { socket })
    }

    /// # Panics
    /// If [`create`](Self::create) fails.
    pub fn create_or_die(port: u16, kind: SocketType, family: Family) -> Self {
        or_die(Self::create(port, kind, family), format_args!("listen on {family} port {port}"))
    }

    /// The port actually bound, useful after binding port 0.
    pub fn local_port(&self) -> std::io::Result<u16> {
        Ok(self.socket.local_addr()?.port())
    }

    /// Waits, without limit, until a connection can be accepted.
    pub fn select(&self) -> std::io::Result<()> {
        self.select_with_timeout(None)
    }

    /// Waits until a connection can be accepted or `timeout` runs out.
    ///
    /// `None` waits forever. Datagram listeners return at once: there is
    /// nothing to accept, only data to read.
    pub fn select_with_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        if self.socket.kind() != SocketType::Stream {
            return Ok(());
        }

        let fd = self.socket.checked_fd()?.as_raw_fd();
        let millis = match timeout {
            None => -1,
            Some(timeout) => timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        };
        let mut pollfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };

        let ready = retry_eintr(|| unsafe { libc::poll(&mut pollfd, 1, millis) as isize });
        match ready {
            -1 => {
                let errno = errno();
                warn!(fd, errno, "poll failed");
                Err(SocketError::Poll { errno }.into())
            }
            0 => {
                debug!(fd, millis, "nothing to accept before the timeout");
                Err(SocketError::Timeout { millis: millis as u128 }.into())
            }
            _ => Ok(()),
        }
    }

    /// Takes the next connection.
    ///
    /// Stream: blocks in `accept` (bounded by the receive timeout) and
    /// returns a socket for the new peer. Datagram: returns at once with a
    /// socket sharing this one's handle; its first receive names the peer.
    pub fn accept(&self) -> std::io::Result<AcceptedSocket> {
        let listener = self.socket.duplicate_fd()?;

        if self.socket.kind() != SocketType::Stream {
            let shared = self.socket.duplicate_fd()?;
            debug!(fd = shared.as_raw_fd(), "datagram accept shares the listening handle");
            let socket = Socket::from_fd(shared, self.socket.family(), self.socket.kind());
            return Ok(AcceptedSocket::new(socket, listener, None));
        }

        let fd = self.socket.checked_fd()?.as_raw_fd();
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let peer_fd = retry_eintr(|| unsafe {
            libc::accept4(
                fd,
                &mut storage as *mut _ as *mut libc::sockaddr,
                &mut len,
                libc::SOCK_CLOEXEC,
            ) as isize
        });
        if peer_fd == -1 {
            let errno = errno();
            warn!(fd, errno, "accept failed");
            return Err(SocketError::Accept { errno }.into());
        }

        let peer_fd = unsafe { OwnedFd::from_raw_fd(peer_fd as RawFd) };
        let peer = SockAddr::from_storage(&storage, len);
        info!(fd = peer_fd.as_raw_fd(), peer = ?peer.map(|addr| addr.to_string()), "accepted");

        let socket = Socket::from_fd(peer_fd, self.socket.family(), self.socket.kind());
        Ok(AcceptedSocket::new(socket, listener, peer))
    }

    /// # Panics
    /// If [`accept`](Self::accept) fails.
    pub fn accept_or_die(&self) -> AcceptedSocket {
        or_die(self.accept(), "accept")
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }
}

impl AsRawFd for ListenSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
