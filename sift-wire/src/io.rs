use std::io::{Read, Write};

use crate::error::{Result, SiftError};

/// Accumulates exactly `n` octets from `source`, looping over short reads
/// the way a `recv()` on a TCP socket can return a partial chunk. A
/// zero-length read before `n` bytes have arrived means the peer closed
/// the connection; any other I/O failure is a transport error.
pub fn read_exact<R: Read>(source: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut received = 0;
    while received < n {
        let chunk = source.read(&mut buf[received..]).map_err(SiftError::TransportError)?;
        if chunk == 0 {
            return Err(SiftError::TransportClosed);
        }
        received += chunk;
    }
    Ok(buf)
}

/// Writes the complete buffer to `sink`, failing with `TransportError` on
/// any I/O failure.
pub fn write_all<W: Write>(sink: &mut W, buf: &[u8]) -> Result<()> {
    sink.write_all(buf).map_err(SiftError::TransportError)
}
