//! Client Façade
//!
//! Blocking calls that each dial a fresh connection, perform one command
//! and close the connection again.
//!
//! Every call returns a typed `Result`; there are no sentinel values.

use std::fs;
use std::io::{BufReader, BufWriter, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::{Result, VaultError};
use crate::protocol::{
    read_blob, read_greeting, read_status, read_string, read_u32, write_command, Command,
    Status,
};
use crate::storage::validate_name;

/// Upper bound on the initial capacity reserved for a file list
const LIST_PREALLOC_LIMIT: usize = 1024;

/// Client for a DrawVault server
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
}

/// One connection's worth of streams, closed on drop
struct Session {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Client for `addr` (host:port) with default timeouts
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::builder().addr(addr).build())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Server address this client dials
    pub fn addr(&self) -> &str {
        &self.config.addr
    }

    /// Names of the drawings stored on the server
    pub fn list_files(&self) -> Result<Vec<String>> {
        self.call(&Command::List, None, |reader| {
            let count = read_u32(reader)? as usize;
            let mut names = Vec::with_capacity(count.min(LIST_PREALLOC_LIMIT));
            for _ in 0..count {
                names.push(read_string(reader)?);
            }
            Ok(names)
        })
    }

    /// Contents of the drawing stored under `name`
    pub fn fetch_bytes(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        let command = Command::Load {
            name: name.to_string(),
        };
        self.call(&command, Some(name), |reader| read_blob(reader))
    }

    /// Fetch `name` and write it to `dest`
    pub fn fetch_file(&self, name: &str, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let data = self.fetch_bytes(name)?;
        let dest = dest.as_ref();
        fs::write(dest, &data)?;

        tracing::debug!(name, dest = %dest.display(), bytes = data.len(), "Fetched file");
        Ok(dest.to_path_buf())
    }

    /// Fetch `name` into a file of the same name in the working directory
    pub fn fetch_to_cwd(&self, name: &str) -> Result<PathBuf> {
        self.fetch_file(name, name)
    }

    /// Store `data` on the server under `remote_name`
    pub fn upload_bytes(&self, remote_name: &str, data: &[u8]) -> Result<()> {
        self.upload(remote_name, Bytes::copy_from_slice(data))
    }

    /// Read `local_path` fully and store it on the server as `remote_name`
    pub fn upload_file(&self, local_path: impl AsRef<Path>, remote_name: &str) -> Result<()> {
        validate_name(remote_name)?;
        let data = fs::read(local_path.as_ref())?;
        let len = data.len();
        self.upload(remote_name, Bytes::from(data))?;

        tracing::debug!(
            local = %local_path.as_ref().display(),
            remote = remote_name,
            bytes = len,
            "Uploaded file"
        );
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn upload(&self, remote_name: &str, data: Bytes) -> Result<()> {
        validate_name(remote_name)?;
        let command = Command::Save {
            name: remote_name.to_string(),
            data,
        };
        self.call(&command, Some(remote_name), |_| Ok(()))
    }

    /// Dial, send `command`, check the status and decode the body
    fn call<T>(
        &self,
        command: &Command,
        name: Option<&str>,
        read_body: impl FnOnce(&mut BufReader<TcpStream>) -> Result<T>,
    ) -> Result<T> {
        let mut session = self.connect()?;
        session.exchange(command, name, read_body).map_err(classify)
    }

    /// Open a connection and wait for the server's greeting
    fn connect(&self) -> Result<Session> {
        let addrs: Vec<SocketAddr> = self
            .config
            .addr
            .to_socket_addrs()
            .map_err(|source| self.connect_error(source))?
            .collect();

        let mut last_error = None;
        let mut stream = None;
        for addr in &addrs {
            let attempt = match self.config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let stream = match stream {
            Some(s) => s,
            None => {
                let source = last_error.unwrap_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::AddrNotAvailable,
                        "address resolved to nothing",
                    )
                });
                return Err(self.connect_error(source));
            }
        };

        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.config.read_timeout())?;
        stream.set_write_timeout(self.config.write_timeout())?;

        let mut session = Session {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        };

        let greeting = read_greeting(&mut session.reader)
            .map_err(|e| match e {
                VaultError::Framing(_) => VaultError::ProtocolViolation(
                    "Server closed the connection before greeting".to_string(),
                ),
                other => other,
            })
            .map_err(classify)?;

        match greeting.status {
            Status::Ok => Ok(session),
            Status::Overloaded => Err(VaultError::Overloaded),
            other => Err(VaultError::ProtocolViolation(format!(
                "Unexpected greeting status {:?}",
                other
            ))),
        }
    }

    fn connect_error(&self, source: std::io::Error) -> VaultError {
        VaultError::Connect {
            addr: self.config.addr.clone(),
            source,
        }
    }
}

impl Session {
    fn exchange<T>(
        &mut self,
        command: &Command,
        name: Option<&str>,
        read_body: impl FnOnce(&mut BufReader<TcpStream>) -> Result<T>,
    ) -> Result<T> {
        write_command(&mut self.writer, command)?;

        // Framing here can only mean the stream ended before the status byte
        let status = read_status(&mut self.reader).map_err(|e| match e {
            VaultError::Framing(_) => VaultError::ProtocolViolation(format!(
                "Server closed the connection without replying to {}",
                command.command_type()
            )),
            other => other,
        })?;
        check_status(status, name, &mut self.reader)?;

        read_body(&mut self.reader)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.writer.get_ref().shutdown(std::net::Shutdown::Both);
    }
}

/// Turn a non-OK status into the matching error
fn check_status<R: Read>(status: Status, name: Option<&str>, reader: &mut R) -> Result<()> {
    match status {
        Status::Ok => Ok(()),
        Status::NotFound => Err(VaultError::NotFound(name.unwrap_or_default().to_string())),
        Status::Rejected => Err(VaultError::ProtocolViolation(format!(
            "Server rejected filename {:?}",
            name.unwrap_or_default()
        ))),
        Status::Overloaded => Err(VaultError::Overloaded),
        Status::Error => Err(VaultError::Server(read_string(reader)?)),
    }
}

/// Socket deadline expiry becomes `Timeout`
fn classify(error: VaultError) -> VaultError {
    if error.is_timeout() {
        VaultError::Timeout
    } else {
        error
    }
}
