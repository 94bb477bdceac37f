use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

pub const SESSION_KEY_SIZE: usize = 32;

/// The four keys derived from a completed handshake. Only the two
/// encryption keys are ever fed to the AEAD; the MAC keys are computed
/// for interoperability with the wire format and are otherwise unused —
/// see the open question this preserves in the top-level design notes.
pub struct SessionKeys {
    pub client_encrypt_key: [u8; SESSION_KEY_SIZE],
    pub client_mac_key: [u8; SESSION_KEY_SIZE],
    pub server_encrypt_key: [u8; SESSION_KEY_SIZE],
    pub server_mac_key: [u8; SESSION_KEY_SIZE],
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.client_encrypt_key.zeroize();
        self.client_mac_key.zeroize();
        self.server_encrypt_key.zeroize();
        self.server_mac_key.zeroize();
    }
}

const CLIENT_ENCRYPTION_KEY_LABEL: &[u8] = b"client_encryption_key";
const CLIENT_MAC_KEY_LABEL: &[u8] = b"client_MAC_key";
const SERVER_ENCRYPTION_KEY_LABEL: &[u8] = b"server_encryption_key";
const SERVER_MAC_KEY_LABEL: &[u8] = b"server_MAC_key";

fn hkdf_expand_32(ikm: &[u8], label: &[u8]) -> [u8; SESSION_KEY_SIZE] {
    let hk = Hkdf::<Sha256>::new(None, ikm);
    let mut out = [0u8; SESSION_KEY_SIZE];
    hk.expand(label, &mut out)
        .expect("32 is a valid HKDF-SHA256 output length");
    out
}

/// Derives the four session keys from `client_random ‖ server_random`
/// via HKDF-SHA256 with no salt, one call per context label. Both peers
/// compute this identically given the same two randoms.
pub fn derive_session_keys(client_random: &[u8; 16], server_random: &[u8; 16]) -> SessionKeys {
    let mut ikm = Vec::with_capacity(32);
    ikm.extend_from_slice(client_random);
    ikm.extend_from_slice(server_random);

    let keys = SessionKeys {
        client_encrypt_key: hkdf_expand_32(&ikm, CLIENT_ENCRYPTION_KEY_LABEL),
        client_mac_key: hkdf_expand_32(&ikm, CLIENT_MAC_KEY_LABEL),
        server_encrypt_key: hkdf_expand_32(&ikm, SERVER_ENCRYPTION_KEY_LABEL),
        server_mac_key: hkdf_expand_32(&ikm, SERVER_MAC_KEY_LABEL),
    };
    ikm.zeroize();
    keys
}

/// A server-side user record: PBKDF2-HMAC-SHA256 digest, the salt and
/// iteration count it was computed under, and the user's upload/download
/// root directory. Populated by whatever credentials store the embedder
/// wires in — this crate only verifies against it.
#[derive(Clone)]
pub struct UserRecord {
    pub pwdhash: Vec<u8>,
    pub salt: Vec<u8>,
    pub iteration_count: u32,
    pub rootdir: String,
}

/// Verifies `password` against `record` by recomputing PBKDF2-HMAC-SHA256
/// under the record's own salt and iteration count, then comparing in
/// constant time. The output length always matches `record.pwdhash`, so a
/// mismatched digest length (a malformed user record) simply fails to
/// verify rather than panicking.
pub fn verify_password(password: &str, record: &UserRecord) -> bool {
    let mut computed = vec![0u8; record.pwdhash.len()];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        &record.salt,
        record.iteration_count,
        &mut computed,
    );
    let matches = computed.ct_eq(&record.pwdhash).into();
    computed.zeroize();
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hkdf_is_deterministic_given_same_randoms() {
        let cr = [0u8; 16];
        let sr = [0xffu8; 16];
        let a = derive_session_keys(&cr, &sr);
        let b = derive_session_keys(&cr, &sr);
        assert_eq!(a.client_encrypt_key, b.client_encrypt_key);
        assert_eq!(a.server_encrypt_key, b.server_encrypt_key);
        assert_eq!(a.client_mac_key, b.client_mac_key);
        assert_eq!(a.server_mac_key, b.server_mac_key);
    }

    #[test]
    fn different_randoms_give_different_keys() {
        let a = derive_session_keys(&[0u8; 16], &[0xffu8; 16]);
        let b = derive_session_keys(&[1u8; 16], &[0xffu8; 16]);
        assert_ne!(a.client_encrypt_key, b.client_encrypt_key);
    }

    #[test]
    fn correct_password_verifies() {
        let mut pwdhash = [0u8; 32];
        pbkdf2_hmac::<Sha256>(b"pw", b"salt1234", 1000, &mut pwdhash);
        let record = UserRecord {
            pwdhash: pwdhash.to_vec(),
            salt: b"salt1234".to_vec(),
            iteration_count: 1000,
            rootdir: "/users/alice".into(),
        };
        assert!(verify_password("pw", &record));
        assert!(!verify_password("wrong", &record));
    }
}
