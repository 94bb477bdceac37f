use std::convert::TryFrom;

use crate::error::SiftError;

/// The ten message type tags defined by the protocol. Only `LoginReq`
/// carries a trailing ETK; every other type is opaque to this crate and
/// is passed through to whichever sub-protocol owns it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MessageType {
    LoginReq,
    LoginRes,
    CommandReq,
    CommandRes,
    UploadReq0,
    UploadReq1,
    UploadRes,
    DnloadReq,
    DnloadRes0,
    DnloadRes1,
}

impl MessageType {
    pub fn tag(self) -> [u8; 2] {
        use MessageType::*;
        match self {
            LoginReq => [0x00, 0x00],
            LoginRes => [0x00, 0x10],
            CommandReq => [0x01, 0x00],
            CommandRes => [0x01, 0x10],
            UploadReq0 => [0x02, 0x00],
            UploadReq1 => [0x02, 0x01],
            UploadRes => [0x02, 0x10],
            DnloadReq => [0x03, 0x00],
            DnloadRes0 => [0x03, 0x10],
            DnloadRes1 => [0x03, 0x11],
        }
    }

    pub fn is_login(self) -> bool {
        matches!(self, MessageType::LoginReq | MessageType::LoginRes)
    }
}

impl TryFrom<[u8; 2]> for MessageType {
    type Error = SiftError;

    fn try_from(tag: [u8; 2]) -> Result<Self, Self::Error> {
        use MessageType::*;
        Ok(match tag {
            [0x00, 0x00] => LoginReq,
            [0x00, 0x10] => LoginRes,
            [0x01, 0x00] => CommandReq,
            [0x01, 0x10] => CommandRes,
            [0x02, 0x00] => UploadReq0,
            [0x02, 0x01] => UploadReq1,
            [0x02, 0x10] => UploadRes,
            [0x03, 0x00] => DnloadReq,
            [0x03, 0x10] => DnloadRes0,
            [0x03, 0x11] => DnloadRes1,
            _ => return Err(SiftError::UnknownType),
        })
    }
}

/// Direction tag folded into the AEAD nonce.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl Direction {
    pub fn tag(self) -> [u8; 2] {
        match self {
            Direction::ClientToServer => [0x00, 0x00],
            Direction::ServerToClient => [0x00, 0x01],
        }
    }
}
