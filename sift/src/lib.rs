//! SiFT v1.0: a confidential, authenticated, replay-resistant
//! request/response channel over a reliable byte stream, bootstrapped by
//! an RSA-to-symmetric login handshake. This crate ties together
//! `sift-wire` (framing primitives), `sift-crypto` (AEAD and key
//! derivation) and `sift-mtp` (the engine and handshake) into a
//! connection facade, RSA key loading, and process-level configuration.

mod config;
mod connection;
mod keys;

pub use config::{default_bind_address, ClientConfig, ServerConfig};
pub use connection::Connection;
pub use keys::{load_private_key, load_public_key};

pub use sift_crypto::UserRecord;
pub use sift_mtp::{InMemoryUserStore, MtpEngine, UserStore};
pub use sift_wire::{Header, MessageType, Result, SiftError, Direction};

/// Initializes `env_logger` with its default filter (`RUST_LOG`
/// controls verbosity). Call once at process startup; a second call is a
/// no-op logged at `debug`.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_config_binds_localhost_5150() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_address, "localhost:5150");
    }

    #[test]
    fn default_client_config_targets_the_same_default_address() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.server_address, default_bind_address());
    }
}
