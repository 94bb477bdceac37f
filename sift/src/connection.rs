use std::io::{Read, Write};

use log::{debug, warn};
use rsa::{RsaPrivateKey, RsaPublicKey};

use sift_mtp::{client_login, server_login, MtpEngine, UserStore};
use sift_wire::{MessageType, SiftError};

/// A logged-in connection: an `MtpEngine` with session keys installed and
/// sequence counters reset, plus the username the handshake authenticated.
/// Wraps `send`/`receive` only to add the logging this crate's ambient
/// stack calls for; the framing and crypto decisions stay in `sift-mtp`.
pub struct Connection<S> {
    engine: MtpEngine<S>,
    username: String,
}

impl<S> Connection<S> {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn into_engine(self) -> MtpEngine<S> {
        self.engine
    }
}

impl<S: Read + Write> Connection<S> {
    /// Drives the client side of the login handshake to completion and
    /// wraps the now-authenticated engine.
    pub fn connect(stream: S, server_public_key: &RsaPublicKey, username: &str, password: &str) -> Result<Self, SiftError> {
        let mut engine = MtpEngine::new(stream);
        match client_login(&mut engine, server_public_key, username, password) {
            Ok(()) => {
                debug!("login handshake completed as client for user {}", username);
                Ok(Connection {
                    engine,
                    username: username.to_string(),
                })
            }
            Err(e) => {
                warn!("client login handshake failed: {}", e);
                Err(e)
            }
        }
    }

    /// Drives the server side of the login handshake to completion over
    /// an already-accepted stream. On any failure the caller should drop
    /// the stream; no `login_res` was sent to a peer that failed to
    /// authenticate.
    pub fn accept(stream: S, server_private_key: &RsaPrivateKey, users: &dyn UserStore) -> Result<Self, SiftError> {
        let mut engine = MtpEngine::new(stream);
        match server_login(&mut engine, server_private_key, users) {
            Ok(username) => {
                debug!("login handshake completed as server for user {}", username);
                Ok(Connection { engine, username })
            }
            Err(e) => {
                warn!("server login handshake failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn send(&mut self, typ: MessageType, payload: &[u8]) -> Result<(), SiftError> {
        debug!("sending message type {:?}, {} octets", typ, payload.len());
        self.engine.send(typ, payload, None)
    }

    pub fn receive(&mut self) -> Result<(MessageType, Vec<u8>), SiftError> {
        match self.engine.receive() {
            Ok((typ, payload)) => {
                debug!("received message type {:?}, {} octets", typ, payload.len());
                Ok((typ, payload))
            }
            Err(SiftError::SequenceMismatch { expected, received }) => {
                warn!(
                    "sequence mismatch from {}: expected {}, received {}",
                    self.username, expected, received
                );
                Err(SiftError::SequenceMismatch { expected, received })
            }
            Err(SiftError::AuthFailed) => {
                warn!("AEAD authentication failed on connection for {}", self.username);
                Err(SiftError::AuthFailed)
            }
            Err(e) => Err(e),
        }
    }
}
