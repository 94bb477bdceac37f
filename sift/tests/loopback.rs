use std::net::{TcpListener, TcpStream};
use std::thread;

use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use sift::{Connection, InMemoryUserStore, MessageType, UserRecord};

fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
    let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
    let public = RsaPublicKey::from(&private);
    (private, public)
}

fn store_with_alice() -> InMemoryUserStore {
    let salt = b"0123456789abcdef".to_vec();
    let iteration_count = 1000;
    let mut pwdhash = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(b"pw", &salt, iteration_count, &mut pwdhash);
    let mut store = InMemoryUserStore::new();
    store.insert(
        "alice",
        UserRecord {
            pwdhash: pwdhash.to_vec(),
            salt,
            iteration_count,
            rootdir: "/users/alice".into(),
        },
    );
    store
}

/// Full client/server login over a real TCP loopback connection, followed
/// by one request/response exchange, matching the one-thread-per-connection
/// model the core leaves to its embedder.
#[test]
fn login_then_command_round_trip_over_tcp_loopback() {
    let (private_key, public_key) = keypair();
    let store = store_with_alice();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut conn = Connection::accept(stream, &private_key, &store).unwrap();
        assert_eq!(conn.username(), "alice");

        let (typ, payload) = conn.receive().unwrap();
        assert_eq!(typ, MessageType::CommandReq);
        assert_eq!(payload, b"list");

        conn.send(MessageType::CommandRes, b"README.md\n").unwrap();
    });

    let client_stream = TcpStream::connect(addr).unwrap();
    let mut client = Connection::connect(client_stream, &public_key, "alice", "pw").unwrap();

    client.send(MessageType::CommandReq, b"list").unwrap();
    let (typ, payload) = client.receive().unwrap();
    assert_eq!(typ, MessageType::CommandRes);
    assert_eq!(payload, b"README.md\n");

    server.join().unwrap();
}

/// Scenario B: a wrong password over the same TCP transport produces a
/// `HandshakeFailed` on the client side (the client's own receive fails
/// because the server tears the connection down without a `login_res`)
/// and the server thread observes the same outcome.
#[test]
fn wrong_password_over_tcp_fails_the_handshake_on_both_sides() {
    let (private_key, public_key) = keypair();
    let store = store_with_alice();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let result = Connection::accept(stream, &private_key, &store);
        assert!(result.is_err());
    });

    let client_stream = TcpStream::connect(addr).unwrap();
    let result = Connection::connect(client_stream, &public_key, "alice", "wrong");
    assert!(result.is_err());

    server.join().unwrap();
}
