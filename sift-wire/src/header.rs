use byteorder::{BigEndian, ByteOrder};
use std::convert::TryFrom;

use crate::error::{Result, SiftError};
use crate::types::MessageType;

/// Protocol version carried in every header; senders always emit this and
/// receivers reject anything else with `UnsupportedVersion`.
pub const VERSION: [u8; 2] = [0x01, 0x00];

pub const HEADER_SIZE: usize = 16;
pub const MAC_SIZE: usize = 12;
pub const ETK_SIZE: usize = 256;

/// The fixed 16-octet MTP header. All multi-octet integer fields are
/// big-endian on the wire; in memory `typ` is already decoded and `len`/
/// `sqn` are plain `u16`s.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Header {
    pub typ: MessageType,
    pub len: u16,
    pub sqn: u16,
    pub rnd: [u8; 6],
    pub rsv: [u8; 2],
}

impl Header {
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..2].copy_from_slice(&VERSION);
        out[2..4].copy_from_slice(&self.typ.tag());
        BigEndian::write_u16(&mut out[4..6], self.len);
        BigEndian::write_u16(&mut out[6..8], self.sqn);
        out[8..14].copy_from_slice(&self.rnd);
        out[14..16].copy_from_slice(&self.rsv);
        out
    }

    /// Splits a raw 16-octet buffer at the fixed offsets. Does not
    /// validate `ver`/`typ` — call `validate` (or rely on `MessageType`'s
    /// `TryFrom` failing) for that.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Header> {
        let ver = [bytes[0], bytes[1]];
        if ver != VERSION {
            return Err(SiftError::UnsupportedVersion);
        }
        let typ = MessageType::try_from([bytes[2], bytes[3]])?;
        let len = BigEndian::read_u16(&bytes[4..6]);
        let sqn = BigEndian::read_u16(&bytes[6..8]);
        let mut rnd = [0u8; 6];
        rnd.copy_from_slice(&bytes[8..14]);
        let rsv = [bytes[14], bytes[15]];
        let header = Header { typ, len, sqn, rnd, rsv };

        let min_len = HEADER_SIZE + MAC_SIZE + if typ == MessageType::LoginReq { ETK_SIZE } else { 0 };
        if (header.len as usize) < min_len {
            return Err(SiftError::ProtocolError("declared message length too short for its type"));
        }

        Ok(header)
    }

    /// Total octets of the message body beyond the header (ciphertext +
    /// MAC + the ETK when present).
    pub fn body_len(&self) -> usize {
        self.len as usize - HEADER_SIZE
    }

    /// Ciphertext-only length: body minus the MAC and, for `login_req`,
    /// minus the trailing ETK.
    pub fn ciphertext_len(&self) -> usize {
        let mut n = self.body_len() - MAC_SIZE;
        if self.typ == MessageType::LoginReq {
            n -= ETK_SIZE;
        }
        n
    }
}
