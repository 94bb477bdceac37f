use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;

use sift_wire::{Direction, SiftError};

/// AES-256-GCM with the tag truncated to 12 bytes, as the protocol
/// specifies (GCM's native tag is 16 bytes; `mac_len = 12` on the wire).
type Cipher = AesGcm<Aes256, U12, U12>;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 12;

/// `sqn ‖ rnd ‖ rsv ‖ direction`, in that order — the 12-byte AES-GCM
/// nonce. Header `sqn`/`rnd`/`rsv` plus the fixed per-key, per-direction
/// tag keep this unique across the lifetime of a single encryption key.
pub fn build_nonce(sqn: u16, rnd: [u8; 6], rsv: [u8; 2], direction: Direction) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0..2].copy_from_slice(&sqn.to_be_bytes());
    nonce[2..8].copy_from_slice(&rnd);
    nonce[8..10].copy_from_slice(&rsv);
    nonce[10..12].copy_from_slice(&direction.tag());
    nonce
}

/// Seals `plaintext` under `key`, with the 16-byte header supplied as
/// associated data. Returns the ciphertext (same length as the
/// plaintext) and the detached 12-byte tag.
pub fn seal(
    key: &[u8; KEY_SIZE],
    sqn: u16,
    rnd: [u8; 6],
    rsv: [u8; 2],
    direction: Direction,
    header: &[u8; 16],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE]), SiftError> {
    let cipher = Cipher::new_from_slice(key)
        .map_err(|_| SiftError::ConfigurationError("invalid AES-256-GCM key length".into()))?;
    let nonce = build_nonce(sqn, rnd, rsv, direction);
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce.into(), header, &mut buffer)
        .map_err(|_| SiftError::ConfigurationError("AEAD seal failed".into()))?;
    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);
    Ok((buffer, tag_bytes))
}

/// Opens `ciphertext` under `key`, verifying `tag` against the header as
/// associated data. Any failure — wrong key, tampered ciphertext, tag,
/// or header — surfaces uniformly as `AuthFailed`; the caller must not
/// try to distinguish tampering from a wrong key.
pub fn open(
    key: &[u8; KEY_SIZE],
    sqn: u16,
    rnd: [u8; 6],
    rsv: [u8; 2],
    direction: Direction,
    header: &[u8; 16],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>, SiftError> {
    let cipher = Cipher::new_from_slice(key)
        .map_err(|_| SiftError::ConfigurationError("invalid AES-256-GCM key length".into()))?;
    let nonce = build_nonce(sqn, rnd, rsv, direction);
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(&nonce.into(), header, &mut buffer, tag.into())
        .map_err(|_| SiftError::AuthFailed)?;
    Ok(buffer)
}
