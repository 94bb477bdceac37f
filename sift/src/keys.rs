use std::path::Path;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use sift_wire::SiftError;

/// Reads the server's RSA-2048 private key from a PKCS#1 PEM file. A
/// missing or malformed file is a fatal startup error, not a protocol
/// error — the caller is expected to log and exit rather than try to
/// continue without a key.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<RsaPrivateKey, SiftError> {
    let path = path.as_ref();
    let pem = std::fs::read_to_string(path).map_err(|e| {
        SiftError::ConfigurationError(format!(
            "could not read private key file {}: {}",
            path.display(),
            e
        ))
    })?;
    RsaPrivateKey::from_pkcs1_pem(&pem).map_err(|e| {
        SiftError::ConfigurationError(format!(
            "private key file {} is not a valid PKCS#1 PEM RSA key: {}",
            path.display(),
            e
        ))
    })
}

/// Reads the peer's RSA-2048 public key from a PKCS#1 PEM file, as the
/// client does for the server's public half.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<RsaPublicKey, SiftError> {
    let path = path.as_ref();
    let pem = std::fs::read_to_string(path).map_err(|e| {
        SiftError::ConfigurationError(format!(
            "could not read public key file {}: {}",
            path.display(),
            e
        ))
    })?;
    RsaPublicKey::from_pkcs1_pem(&pem).map_err(|e| {
        SiftError::ConfigurationError(format!(
            "public key file {} is not a valid PKCS#1 PEM RSA key: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_private_key_file_is_a_configuration_error() {
        let err = load_private_key("/nonexistent/path/to/server_key.pem").unwrap_err();
        assert!(matches!(err, SiftError::ConfigurationError(_)));
    }

    #[test]
    fn missing_public_key_file_is_a_configuration_error() {
        let err = load_public_key("/nonexistent/path/to/server_key_public.pem").unwrap_err();
        assert!(matches!(err, SiftError::ConfigurationError(_)));
    }
}
