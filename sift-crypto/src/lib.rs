//! AES-256-GCM AEAD core and the two key-derivation primitives the
//! handshake needs: HKDF-SHA256 for session keys and PBKDF2-HMAC-SHA256
//! for password verification.

mod aead;
mod kdf;

pub use aead::{build_nonce, open, seal, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_session_keys, verify_password, SessionKeys, UserRecord, SESSION_KEY_SIZE};
