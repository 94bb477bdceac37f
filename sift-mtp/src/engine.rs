use rand::RngCore;
use zeroize::Zeroize;

use sift_crypto::{self as crypto, KEY_SIZE};
use sift_wire::{self as wire, Direction, Header, MessageType, SiftError, ETK_SIZE, HEADER_SIZE, MAC_SIZE};

/// Owns all per-connection MTP state: the sequence-number counters, the
/// client/server role, the handshake's temporary key while it's live, and
/// the two session encryption keys once the handshake has installed
/// them. Generic over the transport so tests can drive it over an
/// in-memory pipe instead of a real socket — the same shape as
/// `brontide::Machine` being generic over `io::Read + io::Write`.
pub struct MtpEngine<S> {
    stream: Option<S>,
    pub(crate) sqn_send: u16,
    pub(crate) sqn_receive: u16,
    pub(crate) is_client: Option<bool>,
    pub(crate) temp_key: Option<[u8; KEY_SIZE]>,
    client_encrypt_key: Option<[u8; KEY_SIZE]>,
    server_encrypt_key: Option<[u8; KEY_SIZE]>,
}

impl<S> Drop for MtpEngine<S> {
    fn drop(&mut self) {
        if let Some(k) = self.temp_key.as_mut() {
            k.zeroize();
        }
        if let Some(k) = self.client_encrypt_key.as_mut() {
            k.zeroize();
        }
        if let Some(k) = self.server_encrypt_key.as_mut() {
            k.zeroize();
        }
    }
}

impl<S> MtpEngine<S> {
    pub fn new(stream: S) -> Self {
        MtpEngine {
            stream: Some(stream),
            sqn_send: 0,
            sqn_receive: 0,
            is_client: None,
            temp_key: None,
            client_encrypt_key: None,
            server_encrypt_key: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn stream_mut(&mut self) -> &mut S {
        self.stream.as_mut().expect("stream taken before drop")
    }

    /// Takes the transport back out of the engine. `stream` is an `Option`
    /// solely so this can move `S` out through `&mut self` — `MtpEngine`
    /// implements `Drop`, so a by-value destructure of `self` to pull the
    /// field out directly is rejected by the borrow checker (E0509).
    pub fn into_inner(mut self) -> S {
        self.stream.take().expect("stream taken before drop")
    }

    fn stream(&mut self) -> &mut S {
        self.stream.as_mut().expect("stream taken before drop")
    }

    pub fn sqn_send(&self) -> u16 {
        self.sqn_send
    }

    pub fn sqn_receive(&self) -> u16 {
        self.sqn_receive
    }

    pub fn is_client(&self) -> Option<bool> {
        self.is_client
    }

    /// Installs the handshake's bootstrap key. Mirrors the reference's
    /// `set_temp_key`: if the role hasn't been pinned down yet, this call
    /// pins it; a later `set_session_keys` call always pins it
    /// authoritatively.
    pub fn set_temp_key(&mut self, temp_key: [u8; KEY_SIZE], is_client: bool) {
        self.temp_key = Some(temp_key);
        if self.is_client.is_none() {
            self.is_client = Some(is_client);
        }
    }

    pub fn clear_temp_key(&mut self) {
        if let Some(mut k) = self.temp_key.take() {
            k.zeroize();
        }
    }

    pub fn set_session_keys(
        &mut self,
        client_encrypt_key: [u8; KEY_SIZE],
        server_encrypt_key: [u8; KEY_SIZE],
        is_client: bool,
    ) {
        self.client_encrypt_key = Some(client_encrypt_key);
        self.server_encrypt_key = Some(server_encrypt_key);
        self.is_client = Some(is_client);
    }

    /// Resets both sequence counters to zero. Called once, immediately
    /// after session keys are installed at the end of the login
    /// handshake, on both peers.
    pub fn reset_sequence_numbers(&mut self) {
        self.sqn_send = 0;
        self.sqn_receive = 0;
    }

    fn role(&self) -> Result<bool, SiftError> {
        self.is_client
            .ok_or(SiftError::ConfigurationError("role (is_client) not yet established".into()))
    }

    fn direction_for(&self, sending: bool) -> Result<Direction, SiftError> {
        let is_client = self.role()?;
        Ok(match (is_client, sending) {
            (true, true) => Direction::ClientToServer,
            (true, false) => Direction::ServerToClient,
            (false, true) => Direction::ServerToClient,
            (false, false) => Direction::ClientToServer,
        })
    }

    fn session_key_for(&self, sending: bool) -> Result<[u8; KEY_SIZE], SiftError> {
        let is_client = self.role()?;
        let key = match (is_client, sending) {
            (true, true) => self.client_encrypt_key,
            (true, false) => self.server_encrypt_key,
            (false, true) => self.server_encrypt_key,
            (false, false) => self.client_encrypt_key,
        };
        key.ok_or(SiftError::ConfigurationError("session keys not yet installed".into()))
    }

    fn key_for(&self, typ: MessageType, sending: bool) -> Result<[u8; KEY_SIZE], SiftError> {
        if typ.is_login() {
            self.temp_key
                .ok_or(SiftError::ConfigurationError("temporary key not set for login message".into()))
        } else {
            self.session_key_for(sending)
        }
    }
}

impl<S: std::io::Write> MtpEngine<S> {
    /// Sends a complete message: draws fresh `rnd`, assembles the header,
    /// seals the payload under the key selected by `typ`/direction, and
    /// writes header ‖ ciphertext ‖ tag ‖ (etk for `login_req`).
    pub fn send(&mut self, typ: MessageType, payload: &[u8], etk: Option<&[u8; ETK_SIZE]>) -> Result<(), SiftError> {
        if typ == MessageType::LoginReq && etk.is_none() {
            return Err(SiftError::ConfigurationError("login_req requires an encrypted temporary key".into()));
        }

        let mut rnd = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut rnd);
        let rsv = [0u8, 0u8];
        let sqn = self.sqn_send;

        let key = self.key_for(typ, true)?;
        let direction = self.direction_for(true)?;

        let len = HEADER_SIZE
            + payload.len()
            + MAC_SIZE
            + if typ == MessageType::LoginReq { ETK_SIZE } else { 0 };
        let header = Header {
            typ,
            len: len as u16,
            sqn,
            rnd,
            rsv,
        };
        let header_bytes = header.serialize();

        let (ciphertext, tag) = crypto::seal(&key, sqn, rnd, rsv, direction, &header_bytes, payload)?;

        wire::write_all(self.stream(), &header_bytes)?;
        wire::write_all(self.stream(), &ciphertext)?;
        wire::write_all(self.stream(), &tag)?;
        if typ == MessageType::LoginReq {
            wire::write_all(self.stream(), etk.unwrap())?;
        }

        self.sqn_send += 1;
        Ok(())
    }
}

impl<S: std::io::Read> MtpEngine<S> {
    /// Reads a non-`login_req` message off the wire: header, ciphertext,
    /// tag, sequence check, AEAD open, counter increment. `login_req` is
    /// deliberately rejected here — the server reads it through the
    /// manual act-one path in the login handshake, because the
    /// decryption key first has to be recovered from the trailing ETK.
    pub fn receive(&mut self) -> Result<(MessageType, Vec<u8>), SiftError> {
        let header_bytes = self.read_header_bytes()?;
        let header = Header::parse(&header_bytes)?;

        if header.typ == MessageType::LoginReq {
            return Err(SiftError::ProtocolError(
                "login_req must be received via the login handshake, not MtpEngine::receive",
            ));
        }

        let ciphertext = wire::read_exact(self.stream(), header.ciphertext_len())?;
        let tag = self.read_tag()?;

        if header.sqn != self.sqn_receive {
            return Err(SiftError::SequenceMismatch {
                expected: self.sqn_receive,
                received: header.sqn,
            });
        }

        let key = self.key_for(header.typ, false)?;
        let direction = self.direction_for(false)?;

        let plaintext = crypto::open(&key, header.sqn, header.rnd, header.rsv, direction, &header_bytes, &ciphertext, &tag)?;

        self.sqn_receive += 1;
        Ok((header.typ, plaintext))
    }

    /// Reads the raw 16-byte header off the wire without interpreting it.
    /// Exposed for the server-side login act, which must read header,
    /// ciphertext, tag and ETK in that exact order before it can even
    /// select a decryption key.
    pub(crate) fn read_header_bytes(&mut self) -> Result<[u8; HEADER_SIZE], SiftError> {
        let bytes = wire::read_exact(self.stream(), HEADER_SIZE)?;
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    pub(crate) fn read_body(&mut self, n: usize) -> Result<Vec<u8>, SiftError> {
        wire::read_exact(self.stream(), n)
    }

    pub(crate) fn read_tag(&mut self) -> Result<[u8; MAC_SIZE], SiftError> {
        let bytes = wire::read_exact(self.stream(), MAC_SIZE)?;
        let mut out = [0u8; MAC_SIZE];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    pub(crate) fn read_etk(&mut self) -> Result<[u8; ETK_SIZE], SiftError> {
        let bytes = wire::read_exact(self.stream(), ETK_SIZE)?;
        let mut out = [0u8; ETK_SIZE];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}
