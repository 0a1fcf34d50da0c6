mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use duallane::{
	BufferConfig, ClientBuilder, ClientSocket, Family, Host, ListenConfig, ListenSocket, Packet,
	SocketType, Transport,
};

fn stream_round_trip(family: Family) {
	let listener = ListenSocket::create(0, SocketType::Stream, family).unwrap();
	let port = listener.local_port().unwrap();

	let server = thread::spawn(move || {
		let mut conn = listener.accept().unwrap();
		assert!(conn.peer().is_some());
		let got = conn.receive(5).unwrap();
		conn.send(&got).unwrap();
		got
	});

	let host = Host::resolve(common::loopback(family)).unwrap();
	let mut client = ClientSocket::create(&host, port, SocketType::Stream, family).unwrap();
	assert_eq!(client.send(&Packet::from("hello")).unwrap(), 5);

	let echoed = client.receive_exact(5).unwrap();
	assert_eq!(echoed.len(), 5);
	assert_eq!(echoed.text(), "hello");
	assert_eq!(server.join().unwrap().text(), "hello");
}

fn datagram_round_trip(family: Family) {
	let listener = ListenSocket::create(0, SocketType::Datagram, family).unwrap();
	let port = listener.local_port().unwrap();
	listener.select().unwrap();

	let host = Host::resolve(common::loopback(family)).unwrap();
	let mut client = ClientSocket::create(&host, port, SocketType::Datagram, family).unwrap();
	let client_addr = client.socket().local_addr().unwrap();

	let server = thread::spawn(move || {
		let mut conn = listener.accept().unwrap();
		assert!(conn.peer().is_none());
		let got = conn.receive(64).unwrap();
		assert_eq!(conn.peer(), Some(client_addr));
		conn.send(&got).unwrap();
		got
	});

	assert_eq!(client.send(&Packet::from("hello")).unwrap(), 5);
	let echoed = client.receive(64).unwrap();
	assert_eq!(echoed.text(), "hello");
	assert_eq!(server.join().unwrap().len(), 5);
}

#[test]
fn stream_round_trip_ipv4() {
	common::init_tracing();
	stream_round_trip(Family::Ipv4);
}

#[test]
fn stream_round_trip_ipv6() {
	common::init_tracing();
	if !common::has_ipv6_loopback() {
		return;
	}
	stream_round_trip(Family::Ipv6);
}

#[test]
fn datagram_round_trip_ipv4() {
	common::init_tracing();
	datagram_round_trip(Family::Ipv4);
}

#[test]
fn datagram_round_trip_ipv6() {
	common::init_tracing();
	if !common::has_ipv6_loopback() {
		return;
	}
	datagram_round_trip(Family::Ipv6);
}

#[test]
fn connect_shorthand_is_ipv4_stream() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Stream, Family::Ipv4).unwrap();
	let port = listener.local_port().unwrap();

	let host = Host::resolve("127.0.0.1").unwrap();
	let client = ClientSocket::connect(&host, port).unwrap();
	assert_eq!(client.socket().kind(), SocketType::Stream);
	assert_eq!(client.socket().family(), Family::Ipv4);

	listener.select_with_timeout(Some(Duration::from_secs(5))).unwrap();
	listener.accept_or_die();
}

#[test]
fn receive_exact_waits_for_slow_sender() {
	common::init_tracing();
	let (tx, rx) = mpsc::channel();

	let server = thread::spawn(move || {
		let listener = ListenSocket::create(0, SocketType::Stream, Family::Ipv4).unwrap();
		tx.send(listener.local_port().unwrap()).unwrap();
		let conn = listener.accept().unwrap();
		conn.send(&Packet::from("hel")).unwrap();
		thread::sleep(Duration::from_millis(100));
		conn.send(&Packet::from("lo")).unwrap();
	});

	let port = rx.recv().unwrap();
	let host = Host::resolve("127.0.0.1").unwrap();
	let mut client = ClientSocket::connect(&host, port).unwrap();
	let packet = client.receive_exact(5).unwrap();
	assert_eq!(packet.text(), "hello");
	server.join().unwrap();
}

#[test]
fn receive_exact_stops_at_peer_close() {
	common::init_tracing();
	let (tx, rx) = mpsc::channel();

	let server = thread::spawn(move || {
		let listener = ListenSocket::create(0, SocketType::Stream, Family::Ipv4).unwrap();
		tx.send(listener.local_port().unwrap()).unwrap();
		let conn = listener.accept().unwrap();
		conn.send(&Packet::from("hi")).unwrap();
	});

	let port = rx.recv().unwrap();
	let host = Host::resolve("127.0.0.1").unwrap();
	let mut client = ClientSocket::connect(&host, port).unwrap();
	server.join().unwrap();

	let packet = client.receive_exact(10).unwrap();
	assert_eq!(packet.as_bytes(), b"hi");

	// closed stream reads as an empty packet, not an error
	assert!(client.receive(10).unwrap().is_empty());
}

#[test]
fn buffer_sizes_are_negotiated() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Datagram, Family::Ipv4).unwrap();
	let socket = listener.socket();

	socket.set_recv_buffer_size(4096).unwrap();
	assert!(socket.recv_buffer_size().unwrap() >= 4096);
	socket.set_send_buffer_size(4096).unwrap();
	assert!(socket.send_buffer_size().unwrap() >= 4096);

	// far beyond rmem_max: the kernel clamps and the shortfall is reported
	let err = socket.set_recv_buffer_size(1 << 30).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::OutOfMemory);

	let err = socket.set_send_buffer_size(0).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn builder_applies_buffers() {
	common::init_tracing();
	let listener = ListenSocket::with_config(
		0,
		SocketType::Datagram,
		Family::Ipv4,
		ListenConfig::new().timeout(Some(Duration::from_secs(1))).buffers(BufferConfig::new().both(8192)),
	)
	.unwrap();
	let port = listener.local_port().unwrap();

	let local = Host::resolve("127.0.0.1").unwrap();
	let client = ClientBuilder::new(SocketType::Datagram, Family::Ipv4)
		.bind(&local, 0)
		.buffers(BufferConfig::new().recv(8192))
		.connect(&local, port)
		.unwrap();

	assert!(client.socket().recv_buffer_size().unwrap() >= 8192);
	assert!(listener.socket().send_buffer_size().unwrap() >= 8192);
	assert_ne!(client.socket().local_addr().unwrap().port(), 0);
}

#[test]
fn bound_client_uses_requested_local_port() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Datagram, Family::Ipv4).unwrap();
	let port = listener.local_port().unwrap();

	// grab a free port, release it, then bind the client to it
	let probe = ListenSocket::create(0, SocketType::Datagram, Family::Ipv4).unwrap();
	let local_port = probe.local_port().unwrap();
	drop(probe);

	let host = Host::resolve("127.0.0.1").unwrap();
	let client = ClientSocket::create_bound(&host, local_port, &host, port, SocketType::Datagram, Family::Ipv4)
		.unwrap();
	assert_eq!(client.socket().local_addr().unwrap().port(), local_port);
}

#[test]
fn ipv6_socket_ignores_ipv4_candidates() {
	common::init_tracing();
	if !common::has_ipv6_loopback() {
		return;
	}
	let host = Host::resolve("127.0.0.1").unwrap();
	let err = ClientSocket::create(&host, 80, SocketType::Stream, Family::Ipv6).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::AddrNotAvailable);
	assert!(err.to_string().contains("no IPv6 address of 127.0.0.1"));
}

#[test]
fn select_times_out_without_clients() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Stream, Family::Ipv4).unwrap();
	let err = listener.select_with_timeout(Some(Duration::from_millis(50))).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
}

#[test]
fn datagram_select_returns_at_once() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Datagram, Family::Ipv4).unwrap();
	listener.select_with_timeout(Some(Duration::from_secs(60))).unwrap();
}

#[test]
fn datagram_send_needs_a_peer() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Datagram, Family::Ipv4).unwrap();
	let conn = listener.accept().unwrap();
	let err = conn.send(&Packet::from("early")).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
}

#[test]
fn raw_kinds_are_rejected_by_client() {
	common::init_tracing();
	let host = Host::resolve("127.0.0.1").unwrap();
	let err = ClientSocket::create(&host, 0, SocketType::Raw, Family::Ipv4).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
}

#[test]
fn destroyed_client_reports_closed() {
	common::init_tracing();
	let listener = ListenSocket::create(0, SocketType::Datagram, Family::Ipv4).unwrap();
	let port = listener.local_port().unwrap();
	let host = Host::resolve("127.0.0.1").unwrap();
	let mut client = ClientSocket::create(&host, port, SocketType::Datagram, Family::Ipv4).unwrap();

	client.socket_mut().destroy();
	client.socket_mut().destroy();
	let err = client.send(&Packet::from("x")).unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
}

#[test]
#[should_panic(expected = "failed")]
fn create_or_die_panics_on_refused_connect() {
	common::init_tracing();
	let host = Host::resolve("127.0.0.1").unwrap();
	ClientSocket::create_or_die(&host, 1, SocketType::Stream, Family::Ipv4);
}
