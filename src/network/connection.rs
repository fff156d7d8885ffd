//! Connection Handler
//!
//! Serves the single command carried by one client connection.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, VaultError};
use crate::protocol::{
    read_command, write_blob, write_greeting, write_status, write_string, write_u32,
    Command, Greeting, Status,
};
use crate::storage::StorageDir;

/// Lifecycle of a connection
///
/// `Connected → CommandRead → {Listing | Saving | Loading | Unknown} → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connected,
    CommandRead,
    Listing,
    Saving,
    Loading,
    Unknown,
    Closed,
}

/// Handles a single client connection
///
/// Owns the socket for its whole lifetime. Dropping the connection closes
/// the socket, whatever path led there.
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Storage directory shared with the other workers
    storage: Arc<StorageDir>,

    /// Peer address for logging
    peer_addr: String,

    state: State,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, storage: Arc<StorageDir>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            storage,
            peer_addr,
            state: State::Connected,
        })
    }

    /// Configure connection timeouts (`None` blocks indefinitely)
    pub fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.get_ref().set_write_timeout(write)?;
        Ok(())
    }

    /// Greet the peer, then read and execute exactly one command
    ///
    /// Storage failures are reported to the peer as a status. An unknown
    /// command gets no reply at all. Errors returned here are socket or
    /// framing failures, or the unknown command itself.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "Connection established");

        write_greeting(&mut self.writer, Greeting::ready())?;

        let command = match read_command(&mut self.reader) {
            Ok(command) => command,
            Err(e @ VaultError::ProtocolViolation(_)) => {
                self.state = State::Unknown;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.state = State::CommandRead;

        tracing::trace!(
            peer = %self.peer_addr,
            command = %command.command_type(),
            "Received command"
        );

        match command {
            Command::List => self.list()?,
            Command::Save { name, data } => self.save(&name, &data)?,
            Command::Load { name } => self.load(&name)?,
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Flush and close both directions of the socket
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        let _ = self.writer.flush();
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);

        tracing::debug!(peer = %self.peer_addr, last_state = ?self.state, "Connection closed");
        self.state = State::Closed;
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn list(&mut self) -> Result<()> {
        self.state = State::Listing;

        let names = match self.storage.list() {
            Ok(names) => names,
            Err(e) => return self.reply_error(e),
        };

        tracing::info!(peer = %self.peer_addr, count = names.len(), "Sending file list");

        write_status(&mut self.writer, Status::Ok)?;
        write_u32(&mut self.writer, names.len() as u32)?;
        for name in &names {
            write_string(&mut self.writer, name)?;
        }
        Ok(())
    }

    fn save(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.state = State::Saving;

        if let Err(e) = self.storage.save(name, data) {
            return self.reply_error(e);
        }

        tracing::info!(peer = %self.peer_addr, name, bytes = data.len(), "Saved file");
        write_status(&mut self.writer, Status::Ok)
    }

    fn load(&mut self, name: &str) -> Result<()> {
        self.state = State::Loading;

        let data = match self.storage.load(name) {
            Ok(data) => data,
            Err(e) => return self.reply_error(e),
        };

        tracing::info!(peer = %self.peer_addr, name, bytes = data.len(), "Sending file");
        write_status(&mut self.writer, Status::Ok)?;
        write_blob(&mut self.writer, &data)
    }

    /// Report a storage failure to the peer
    fn reply_error(&mut self, error: VaultError) -> Result<()> {
        match &error {
            VaultError::NotFound(name) => {
                tracing::debug!(peer = %self.peer_addr, name = %name, "File not found");
                write_status(&mut self.writer, Status::NotFound)
            }
            VaultError::ProtocolViolation(reason) => {
                tracing::warn!(peer = %self.peer_addr, %reason, "Rejected request");
                write_status(&mut self.writer, Status::Rejected)
            }
            _ => {
                tracing::warn!(peer = %self.peer_addr, error = %error, "Storage failure");
                write_status(&mut self.writer, Status::Error)?;
                write_string(&mut self.writer, &error.to_string())
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
