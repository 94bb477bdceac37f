use std::io::{Read, Write};

use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use sift_crypto::{derive_session_keys, verify_password, UserRecord};
use sift_wire::{MessageType, SiftError};

use crate::engine::MtpEngine;

const RANDOM_SIZE: usize = 16;
const TEMP_KEY_SIZE: usize = 32;

/// Looks up user records by username. The crate defines this trait and an
/// in-memory implementation for its own tests; a file-backed store is an
/// external collaborator, not part of this crate.
pub trait UserStore {
    fn lookup(&self, username: &str) -> Option<UserRecord>;
}

/// A trivial in-memory `UserStore`, handy for tests and for embedders who
/// don't need file-backed credentials.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: std::collections::HashMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, username: impl Into<String>, record: UserRecord) {
        self.users.insert(username.into(), record);
    }
}

impl UserStore for InMemoryUserStore {
    fn lookup(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).cloned()
    }
}

fn build_login_req_payload(username: &str, password: &str, client_random: &[u8; RANDOM_SIZE]) -> Vec<u8> {
    format!("{}\n{}\n{}", username, password, hex::encode(client_random)).into_bytes()
}

fn parse_login_req_payload(payload: &[u8]) -> Result<(String, String, [u8; RANDOM_SIZE]), SiftError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| SiftError::HandshakeFailed("login_req payload is not valid UTF-8".into()))?;
    let mut fields = text.split('\n');
    let username = fields
        .next()
        .ok_or_else(|| SiftError::HandshakeFailed("login_req payload missing username".into()))?;
    let password = fields
        .next()
        .ok_or_else(|| SiftError::HandshakeFailed("login_req payload missing password".into()))?;
    let client_random_hex = fields
        .next()
        .ok_or_else(|| SiftError::HandshakeFailed("login_req payload missing client_random".into()))?;
    if fields.next().is_some() {
        return Err(SiftError::HandshakeFailed("login_req payload has extra fields".into()));
    }

    let client_random_bytes = hex::decode(client_random_hex)
        .map_err(|_| SiftError::HandshakeFailed("client_random is not valid hex".into()))?;
    if client_random_bytes.len() != RANDOM_SIZE {
        return Err(SiftError::HandshakeFailed("client_random is not 16 octets".into()));
    }
    let mut client_random = [0u8; RANDOM_SIZE];
    client_random.copy_from_slice(&client_random_bytes);

    Ok((username.to_string(), password.to_string(), client_random))
}

fn build_login_res_payload(request_hash: &[u8; 32], server_random: &[u8; RANDOM_SIZE]) -> Vec<u8> {
    format!("{}\n{}", hex::encode(request_hash), hex::encode(server_random)).into_bytes()
}

fn parse_login_res_payload(payload: &[u8]) -> Result<([u8; 32], [u8; RANDOM_SIZE]), SiftError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| SiftError::HandshakeFailed("login_res payload is not valid UTF-8".into()))?;
    let mut fields = text.split('\n');
    let request_hash_hex = fields
        .next()
        .ok_or_else(|| SiftError::HandshakeFailed("login_res payload missing request_hash".into()))?;
    let server_random_hex = fields
        .next()
        .ok_or_else(|| SiftError::HandshakeFailed("login_res payload missing server_random".into()))?;
    if fields.next().is_some() {
        return Err(SiftError::HandshakeFailed("login_res payload has extra fields".into()));
    }

    let request_hash_bytes = hex::decode(request_hash_hex)
        .map_err(|_| SiftError::HandshakeFailed("request_hash is not valid hex".into()))?;
    if request_hash_bytes.len() != 32 {
        return Err(SiftError::HandshakeFailed("request_hash is not 32 octets".into()));
    }
    let mut request_hash = [0u8; 32];
    request_hash.copy_from_slice(&request_hash_bytes);

    let server_random_bytes = hex::decode(server_random_hex)
        .map_err(|_| SiftError::HandshakeFailed("server_random is not valid hex".into()))?;
    if server_random_bytes.len() != RANDOM_SIZE {
        return Err(SiftError::HandshakeFailed("server_random is not 16 octets".into()));
    }
    let mut server_random = [0u8; RANDOM_SIZE];
    server_random.copy_from_slice(&server_random_bytes);

    Ok((request_hash, server_random))
}

/// Runs the client side of the login handshake: `Init -> Sent -> Verified`.
/// On success the engine holds installed session keys, reset counters, and
/// a cleared temp_key.
pub fn client_login<S: Read + Write>(
    engine: &mut MtpEngine<S>,
    server_public_key: &RsaPublicKey,
    username: &str,
    password: &str,
) -> Result<(), SiftError> {
    let mut rng = rand::thread_rng();

    let mut temp_key = [0u8; TEMP_KEY_SIZE];
    rng.fill_bytes(&mut temp_key);
    engine.set_temp_key(temp_key, true);

    let mut client_random = [0u8; RANDOM_SIZE];
    rng.fill_bytes(&mut client_random);

    let etk_plain = server_public_key
        .encrypt(&mut rng, Oaep::new::<Sha1>(), &temp_key)
        .map_err(|_| SiftError::HandshakeFailed("RSA-OAEP encryption of temp_key failed".into()))?;
    let mut etk = [0u8; sift_wire::ETK_SIZE];
    if etk_plain.len() != sift_wire::ETK_SIZE {
        return Err(SiftError::HandshakeFailed("server public key did not produce a 256-octet ETK".into()));
    }
    etk.copy_from_slice(&etk_plain);

    let payload = build_login_req_payload(username, password, &client_random);
    let request_hash: [u8; 32] = Sha256::digest(&payload).into();

    engine.send(MessageType::LoginReq, &payload, Some(&etk))?;

    let (typ, response_payload) = engine.receive()?;
    if typ != MessageType::LoginRes {
        return Err(SiftError::ProtocolError("expected login_res in reply to login_req"));
    }

    let (received_hash, server_random) = parse_login_res_payload(&response_payload)?;
    let hashes_match: bool = received_hash.ct_eq(&request_hash).into();
    if !hashes_match {
        return Err(SiftError::HandshakeFailed("login_res request_hash does not match the sent request".into()));
    }

    let session_keys = derive_session_keys(&client_random, &server_random);
    engine.set_session_keys(session_keys.client_encrypt_key, session_keys.server_encrypt_key, true);
    engine.reset_sequence_numbers();
    engine.clear_temp_key();

    temp_key.zeroize();
    Ok(())
}

/// Runs the server side of the login handshake: `Waiting -> Authenticated`.
/// Reads the `login_req` message manually (header, ciphertext, tag, ETK,
/// in that order) because the decryption key has to be recovered from the
/// ETK before the payload can be opened. Returns the authenticated
/// username on success; on any failure the connection must be dropped by
/// the caller without a `login_res` ever having been sent.
pub fn server_login<S: Read + Write>(
    engine: &mut MtpEngine<S>,
    server_private_key: &RsaPrivateKey,
    users: &dyn UserStore,
) -> Result<String, SiftError> {
    let header_bytes = engine.read_header_bytes()?;
    let header = sift_wire::Header::parse(&header_bytes)?;
    if header.typ != MessageType::LoginReq {
        return Err(SiftError::ProtocolError("expected login_req as the first message on a new connection"));
    }

    let ciphertext = engine.read_body(header.ciphertext_len())?;
    let tag = engine.read_tag()?;
    let etk = engine.read_etk()?;

    let mut temp_key_plain = server_private_key
        .decrypt(Oaep::new::<Sha1>(), &etk)
        .map_err(|_| SiftError::HandshakeFailed("RSA-OAEP decryption of ETK failed".into()))?;
    if temp_key_plain.len() != TEMP_KEY_SIZE {
        temp_key_plain.zeroize();
        return Err(SiftError::HandshakeFailed("decrypted temp_key is not 32 octets".into()));
    }
    let mut temp_key = [0u8; TEMP_KEY_SIZE];
    temp_key.copy_from_slice(&temp_key_plain);
    temp_key_plain.zeroize();
    engine.set_temp_key(temp_key, false);

    if header.sqn != engine.sqn_receive() {
        return Err(SiftError::SequenceMismatch {
            expected: engine.sqn_receive(),
            received: header.sqn,
        });
    }

    let plaintext = sift_crypto::open(
        &temp_key,
        header.sqn,
        header.rnd,
        header.rsv,
        sift_wire::Direction::ClientToServer,
        &header_bytes,
        &ciphertext,
        &tag,
    )?;
    engine.sqn_receive += 1;

    let request_hash: [u8; 32] = Sha256::digest(&plaintext).into();
    let (username, password, client_random) = parse_login_req_payload(&plaintext)?;

    let record = users
        .lookup(&username)
        .ok_or_else(|| SiftError::HandshakeFailed("unknown user".into()))?;
    if !verify_password(&password, &record) {
        return Err(SiftError::HandshakeFailed("bad password".into()));
    }

    let mut server_random = [0u8; RANDOM_SIZE];
    rand::thread_rng().fill_bytes(&mut server_random);
    let response_payload = build_login_res_payload(&request_hash, &server_random);

    let session_keys = derive_session_keys(&client_random, &server_random);
    engine.set_session_keys(session_keys.client_encrypt_key, session_keys.server_encrypt_key, false);

    engine.send(MessageType::LoginRes, &response_payload, None)?;

    engine.reset_sequence_numbers();
    engine.clear_temp_key();

    Ok(username)
}
