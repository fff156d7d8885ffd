//! Command definitions
//!
//! Represents the single command a connection carries.

use std::fmt;
use std::io::{Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, VaultError};
use super::codec::{put_blob, put_string, read_blob, read_string, write_blob, write_string};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    List,
    Save,
    Load,
}

impl CommandType {
    /// The command string sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::List => "list",
            CommandType::Save => "save",
            CommandType::Load => "load",
        }
    }

    /// Parse a wire command string (exact, case-sensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(CommandType::List),
            "save" => Some(CommandType::Save),
            "load" => Some(CommandType::Load),
            _ => None,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List stored drawings
    List,

    /// Store `data` under `name`, replacing any existing entry
    Save { name: String, data: Bytes },

    /// Fetch the drawing stored under `name`
    Load { name: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::List => CommandType::List,
            Command::Save { .. } => CommandType::Save,
            Command::Load { .. } => CommandType::Load,
        }
    }
}

/// Encode a command to bytes
///
/// Format: command string, then the command's own frames
pub fn encode_command(command: &Command) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    put_string(&mut buf, command.command_type().as_str())?;

    match command {
        Command::List => {}
        Command::Save { name, data } => {
            put_string(&mut buf, name)?;
            put_blob(&mut buf, data)?;
        }
        Command::Load { name } => {
            put_string(&mut buf, name)?;
        }
    }

    Ok(buf.freeze())
}

/// Write a command to a stream
///
/// Frames go straight to `writer`; the payload is never copied into an
/// intermediate buffer.
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_string(writer, command.command_type().as_str())?;

    match command {
        Command::List => {}
        Command::Save { name, data } => {
            write_string(writer, name)?;
            write_blob(writer, data)?;
        }
        Command::Load { name } => {
            write_string(writer, name)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read a complete command from a stream
///
/// Blocks until every frame of the command has arrived. An unrecognised
/// command string is a protocol violation.
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let word = read_string(reader)?;

    match CommandType::parse(&word) {
        Some(CommandType::List) => Ok(Command::List),
        Some(CommandType::Save) => {
            let name = read_string(reader)?;
            let data = Bytes::from(read_blob(reader)?);
            Ok(Command::Save { name, data })
        }
        Some(CommandType::Load) => {
            let name = read_string(reader)?;
            Ok(Command::Load { name })
        }
        None => Err(VaultError::ProtocolViolation(format!(
            "Unknown command: {:?}",
            word
        ))),
    }
}
