//! TCP Server
//!
//! Accepts connections and dispatches them to the worker pool.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::protocol::{write_greeting, Greeting};
use crate::storage::StorageDir;

use super::{Connection, WorkerPool};

/// How long the acceptor may spend telling a client it is overloaded
const REJECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP server for DrawVault
pub struct Server {
    config: Config,
    storage: Arc<StorageDir>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Open the configured storage directory and bind the listener
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(StorageDir::open(&config.storage_dir)?);
        Self::bind(config, storage)
    }

    /// Bind the listener over an already opened storage directory
    ///
    /// A bind failure is returned as `VaultError::Connect`; there is no retry.
    pub fn bind(config: Config, storage: Arc<StorageDir>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|source| {
            VaultError::Connect {
                addr: config.listen_addr.clone(),
                source,
            }
        })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            storage,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn storage(&self) -> &Arc<StorageDir> {
        &self.storage
    }

    /// Handle that stops `run` from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Accept connections until shut down (blocking)
    ///
    /// Accept failures are logged and the loop continues. On shutdown the
    /// queued connections are still served before this returns.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            address = %self.local_addr,
            storage = %self.storage.root().display(),
            workers = self.config.workers,
            max_pending = self.config.max_pending,
            "Server listening"
        );

        let storage = Arc::clone(&self.storage);
        let config = self.config.clone();
        let pool = WorkerPool::new(
            self.config.workers,
            self.config.max_pending,
            move |stream: TcpStream| handle_connection(stream, &storage, &config),
        )?;

        for incoming in self.listener.incoming() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            match incoming {
                Ok(stream) => {
                    tracing::debug!(
                        peer = %peer_of(&stream),
                        pending = pool.pending(),
                        "Accepted connection"
                    );
                    if let Err(stream) = pool.submit(stream) {
                        reject_overloaded(stream);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }

        tracing::info!("Shutting down, draining workers");
        pool.join();
        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Stops a running server
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting connections
    ///
    /// The acceptor is blocked in `accept`, so a throwaway connection is made
    /// to wake it.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
        if let Ok(stream) = TcpStream::connect_timeout(&self.wake_addr, Duration::from_secs(1)) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Worker entry point: one connection, one command, then close
fn handle_connection(stream: TcpStream, storage: &Arc<StorageDir>, config: &Config) {
    let mut connection = match Connection::new(stream, Arc::clone(storage)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to set up connection");
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(config.read_timeout(), config.write_timeout()) {
        tracing::warn!(peer = %connection.peer_addr(), error = %e, "Failed to set timeouts");
        return;
    }

    match connection.handle() {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            tracing::debug!(peer = %connection.peer_addr(), "Read timeout");
        }
        Err(e) if e.is_disconnect() => {
            tracing::debug!(peer = %connection.peer_addr(), error = %e, "Client went away");
        }
        Err(e) => {
            tracing::warn!(
                peer = %connection.peer_addr(),
                state = ?connection.state(),
                error = %e,
                "Closing connection after error"
            );
        }
    }
}

/// Tell the client no worker is free, then close
fn reject_overloaded(mut stream: TcpStream) {
    let peer = peer_of(&stream);
    tracing::warn!(peer = %peer, "Worker pool saturated, rejecting connection");

    let _ = stream.set_write_timeout(Some(REJECT_WRITE_TIMEOUT));
    if let Err(e) = write_greeting(&mut stream, Greeting::overloaded()) {
        tracing::debug!(peer = %peer, error = %e, "Failed to send overload notice");
    }
    let _ = stream.shutdown(Shutdown::Both);
}

fn peer_of(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Loopback equivalent of a wildcard bind address
fn wake_addr(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port())
        }
        _ => local,
    }
}
