//! Protocol codec
//!
//! Length-prefixed frames shared by server and client.
//!
//! ## Wire Format
//!
//! ### String
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (2)  │        UTF-8 bytes          │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Blob
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Raw bytes           │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! All integers are big-endian. There is no checksum: the transport (TCP)
//! is trusted to deliver bytes intact.

use std::io::{ErrorKind, Read, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{Result, VaultError};
use super::{Greeting, Status};

/// Longest string frame payload (bytes)
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Largest blob accepted from the wire (256 MB)
pub const MAX_BLOB_SIZE: u32 = 256 * 1024 * 1024;

// =============================================================================
// Encoding (into a buffer)
// =============================================================================

/// Append a string frame to `buf`
pub fn put_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_STRING_LEN {
        return Err(VaultError::Framing(format!(
            "String too long: {} bytes (max {})",
            bytes.len(),
            MAX_STRING_LEN
        )));
    }
    buf.reserve(2 + bytes.len());
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
    Ok(())
}

/// Append a blob frame to `buf`
pub fn put_blob(buf: &mut BytesMut, data: &[u8]) -> Result<()> {
    if data.len() > MAX_BLOB_SIZE as usize {
        return Err(VaultError::Framing(format!(
            "Blob too large: {} bytes (max {})",
            data.len(),
            MAX_BLOB_SIZE
        )));
    }
    buf.reserve(4 + data.len());
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
    Ok(())
}

// =============================================================================
// Stream-based I/O
// =============================================================================

/// Write a string frame to a stream
pub fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let mut buf = BytesMut::new();
    put_string(&mut buf, s)?;
    writer.write_all(&buf)?;
    Ok(())
}

/// Read a string frame from a stream
pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let mut len = [0u8; 2];
    read_exact(reader, &mut len, "string length")?;
    let len = u16::from_be_bytes(len) as usize;

    let mut bytes = vec![0u8; len];
    read_exact(reader, &mut bytes, "string body")?;

    String::from_utf8(bytes)
        .map_err(|e| VaultError::Framing(format!("String is not valid UTF-8: {}", e)))
}

/// Write a blob frame to a stream
pub fn write_blob<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    if data.len() > MAX_BLOB_SIZE as usize {
        return Err(VaultError::Framing(format!(
            "Blob too large: {} bytes (max {})",
            data.len(),
            MAX_BLOB_SIZE
        )));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes())?;
    writer.write_all(data)?;
    Ok(())
}

/// Read a blob frame from a stream
///
/// The buffer is sized exactly to the declared length.
pub fn read_blob<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_u32(reader)?;
    if len > MAX_BLOB_SIZE {
        return Err(VaultError::Framing(format!(
            "Blob too large: {} bytes (max {})",
            len, MAX_BLOB_SIZE
        )));
    }

    let mut data = vec![0u8; len as usize];
    read_exact(reader, &mut data, "blob body")?;
    Ok(data)
}

/// Write a big-endian u32
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

/// Read a big-endian u32
pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    read_exact(reader, &mut bytes, "length")?;
    Ok(u32::from_be_bytes(bytes))
}

/// Write a single status byte
pub fn write_status<W: Write>(writer: &mut W, status: Status) -> Result<()> {
    writer.write_all(&[status as u8])?;
    Ok(())
}

/// Read a single status byte
pub fn read_status<R: Read>(reader: &mut R) -> Result<Status> {
    let mut byte = [0u8; 1];
    read_exact(reader, &mut byte, "status")?;
    Status::from_byte(byte[0])
}

/// Write the connection greeting
pub fn write_greeting<W: Write>(writer: &mut W, greeting: Greeting) -> Result<()> {
    writer.write_all(&greeting.to_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read the connection greeting
pub fn read_greeting<R: Read>(reader: &mut R) -> Result<Greeting> {
    let mut bytes = [0u8; 2];
    read_exact(reader, &mut bytes, "greeting")?;
    Greeting::from_bytes(bytes)
}

/// `read_exact` that reports truncation as a framing error
///
/// Other I/O failures (including timeouts) pass through untouched.
fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    let expected = buf.len();
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            VaultError::Framing(format!(
                "Stream closed while reading {} ({} bytes expected)",
                what, expected
            ))
        } else {
            VaultError::Io(e)
        }
    })
}
