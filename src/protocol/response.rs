//! Response definitions
//!
//! Status codes and the connection greeting sent by the server.

use crate::error::{Result, VaultError};

/// Wire protocol version spoken by this crate
///
/// Version 1 had no greeting and no status bytes, and answered a `load` of a
/// missing file with silence.
pub const PROTOCOL_VERSION: u8 = 2;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Rejected = 0x02,
    Overloaded = 0x03,
    Error = 0x04,
}

impl Status {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::NotFound),
            0x02 => Ok(Status::Rejected),
            0x03 => Ok(Status::Overloaded),
            0x04 => Ok(Status::Error),
            _ => Err(VaultError::ProtocolViolation(format!(
                "Unknown response status: 0x{:02x}",
                byte
            ))),
        }
    }
}

/// First two bytes the server writes on every connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greeting {
    pub version: u8,
    pub status: Status,
}

impl Greeting {
    /// A worker picked the connection up and is waiting for a command
    pub fn ready() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            status: Status::Ok,
        }
    }

    /// No worker is free and the pending queue is full
    pub fn overloaded() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            status: Status::Overloaded,
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.version, self.status as u8]
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        if bytes[0] != PROTOCOL_VERSION {
            return Err(VaultError::ProtocolViolation(format!(
                "Unsupported protocol version {} (expected {})",
                bytes[0], PROTOCOL_VERSION
            )));
        }
        Ok(Self {
            version: bytes[0],
            status: Status::from_byte(bytes[1])?,
        })
    }
}
