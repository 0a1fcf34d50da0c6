use crate::addr::Family;
use crate::socket::SocketType;

/// Socket creation/configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("socket({kind}, {family}) failed: {}", errno_to_str(*.errno))]
    Create { errno: i32, kind: SocketType, family: Family },

    #[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
    Bind { errno: i32, addr: String },

    #[error("listen(backlog={backlog}) failed: {}", errno_to_str(*.errno))]
    Listen { errno: i32, backlog: i32 },

    #[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
    Connect { errno: i32, addr: String },

    #[error("no {family} address of {host} accepted {op}{}", last_errno_suffix(*.errno))]
    NoCandidate { op: &'static str, host: String, family: Family, errno: Option<i32> },

    #[error("accept() failed: {}", errno_to_str(*.errno))]
    Accept { errno: i32 },

    #[error("poll() failed: {}", errno_to_str(*.errno))]
    Poll { errno: i32 },

    #[error("timed out after {millis}ms waiting for a connection")]
    Timeout { millis: u128 },

    #[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
    SetOption { errno: i32, option: &'static str },

    #[error("getsockopt({option}) failed: {}", errno_to_str(*.errno))]
    GetOption { errno: i32, option: &'static str },

    #[error("{option} negotiated {actual} bytes, wanted at least {requested}")]
    BufferTooSmall { option: &'static str, requested: usize, actual: usize },

    #[error("{kind} sockets cannot be used as {role}")]
    Unsupported { kind: SocketType, role: &'static str },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },
}

/// I/O operation errors.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("recv() failed: {}", errno_to_str(*.errno))]
    Read { errno: i32 },

    #[error("send() failed: {}", errno_to_str(*.errno))]
    Write { errno: i32 },

    #[error("receive length must be positive")]
    ZeroLength,

    #[error("no datagram peer recorded yet; receive before sending")]
    NoPeer,

    #[error("socket already destroyed")]
    Closed,
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

fn last_errno_suffix(errno: Option<i32>) -> String {
    match errno {
        Some(errno) => format!(": {}", errno_to_str(errno)),
        None => String::new(),
    }
}

/// Converts errno to human-readable string.
pub(crate) fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EPERM => "operation not permitted".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EMFILE => "too many open files".into(),
        libc::EHOSTUNREACH => "host unreachable".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::EPROTONOSUPPORT => "protocol not supported".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl From<SocketError> for std::io::Error {
    fn from(err: SocketError) -> Self {
        let kind = match &err {
            SocketError::Resolve { .. } => std::io::ErrorKind::NotFound,
            SocketError::Create { errno, .. } => errno_to_kind(*errno),
            SocketError::Bind { errno, .. } => errno_to_kind(*errno),
            SocketError::Listen { errno, .. } => errno_to_kind(*errno),
            SocketError::Connect { errno, .. } => errno_to_kind(*errno),
            SocketError::NoCandidate { errno: Some(errno), .. } => errno_to_kind(*errno),
            SocketError::NoCandidate { errno: None, .. } => std::io::ErrorKind::AddrNotAvailable,
            SocketError::Accept { errno } => errno_to_kind(*errno),
            SocketError::Poll { errno } => errno_to_kind(*errno),
            SocketError::Timeout { .. } => std::io::ErrorKind::TimedOut,
            SocketError::SetOption { errno, .. } => errno_to_kind(*errno),
            SocketError::GetOption { errno, .. } => errno_to_kind(*errno),
            SocketError::BufferTooSmall { .. } => std::io::ErrorKind::OutOfMemory,
            SocketError::Unsupported { .. } => std::io::ErrorKind::Unsupported,
            SocketError::InvalidAddress { .. } => std::io::ErrorKind::InvalidInput,
        };
        std::io::Error::new(kind, err)
    }
}

impl From<IoError> for std::io::Error {
    fn from(err: IoError) -> Self {
        let kind = match &err {
            IoError::Read { errno } => errno_to_kind(*errno),
            IoError::Write { errno } => errno_to_kind(*errno),
            IoError::ZeroLength => std::io::ErrorKind::InvalidInput,
            IoError::NoPeer => std::io::ErrorKind::NotConnected,
            IoError::Closed => std::io::ErrorKind::NotConnected,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_kinds_survive_conversion() {
        let err: std::io::Error = SocketError::Connect {
            errno: libc::ECONNREFUSED,
            addr: "127.0.0.1:1".into(),
        }
        .into();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
        assert_eq!(err.to_string(), "connect(127.0.0.1:1) failed: connection refused");

        let err: std::io::Error = IoError::NoPeer.into();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
    }

    #[test]
    fn no_candidate_message_mentions_last_failure() {
        let err = SocketError::NoCandidate {
            op: "connect",
            host: "::1".into(),
            family: Family::Ipv6,
            errno: Some(libc::ENETUNREACH),
        };
        assert_eq!(err.to_string(), "no IPv6 address of ::1 accepted connect: network unreachable");

        let err = SocketError::NoCandidate { op: "bind", host: "x".into(), family: Family::Ipv4, errno: None };
        assert_eq!(err.to_string(), "no IPv4 address of x accepted bind");
    }
}
