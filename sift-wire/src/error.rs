use std::{error, fmt, io};

/// The complete SiFT error taxonomy, shared by every crate in the stack so
/// that a single `match` at the connection boundary can decide whether to
/// log-and-abort or (never, within a connection) recover.
///
/// Every variant here terminates the connection it was raised on; there is
/// no retry or recovery path inside the core. See the MTP and Login
/// handshake modules for which operations raise which variant.
#[derive(Debug)]
pub enum SiftError {
    /// The transport returned an I/O error other than a clean close.
    TransportError(io::Error),
    /// The peer closed the connection mid-read or mid-write.
    TransportClosed,
    /// Header `ver` was not `0x01 0x00`.
    UnsupportedVersion,
    /// Header `typ` did not decode to one of the ten known message types.
    UnknownType,
    /// Header `sqn` did not equal the expected counter value.
    SequenceMismatch { expected: u16, received: u16 },
    /// AEAD tag verification failed.
    AuthFailed,
    /// A message of the wrong type arrived for the current protocol state
    /// (e.g. something other than `login_res` after sending `login_req`).
    ProtocolError(&'static str),
    /// Login failed: bad username/password, malformed sizes, OAEP failure.
    /// The message is for local logs only; never echoed to the peer.
    HandshakeFailed(String),
    /// A required key or role was missing at the call site, or ambient
    /// setup (e.g. a key file) was missing or malformed. Indicates a bug
    /// in the caller or a fatal startup condition, not a protocol
    /// violation by the peer.
    ConfigurationError(String),
}

impl fmt::Display for SiftError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SiftError::*;

        match self {
            TransportError(e) => write!(f, "transport error: {}", e),
            TransportClosed => write!(f, "connection closed by peer"),
            UnsupportedVersion => write!(f, "unsupported header version"),
            UnknownType => write!(f, "unknown message type"),
            SequenceMismatch { expected, received } => write!(
                f,
                "sequence number mismatch: expected {}, received {}",
                expected, received
            ),
            AuthFailed => write!(f, "AEAD authentication failed"),
            ProtocolError(msg) => write!(f, "protocol error: {}", msg),
            HandshakeFailed(msg) => write!(f, "handshake failed: {}", msg),
            ConfigurationError(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl error::Error for SiftError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SiftError::TransportError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SiftError {
    fn from(e: io::Error) -> Self {
        SiftError::TransportError(e)
    }
}

pub type Result<T> = std::result::Result<T, SiftError>;
