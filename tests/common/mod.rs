#![allow(dead_code)]

use duallane::{ClientBuilder, Family, Host, SocketType};

/// Routes library logs to the test harness. `RUST_LOG=duallane=debug`
/// shows the candidate walks.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::WARN.into()),
		)
		.with_test_writer()
		.try_init();
}

/// Loopback literal for `family`.
pub fn loopback(family: Family) -> &'static str {
	match family {
		Family::Ipv4 => "127.0.0.1",
		Family::Ipv6 => "::1",
	}
}

/// False on hosts without a usable IPv6 loopback; those tests skip.
pub fn has_ipv6_loopback() -> bool {
	let Ok(host) = Host::resolve("::1") else {
		return false;
	};
	// binding ::1 fails when the loopback has no IPv6 address
	ClientBuilder::new(SocketType::Datagram, Family::Ipv6)
		.bind(&host, 0)
		.connect(&host, 9)
		.is_ok()
}
