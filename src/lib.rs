//! # DrawVault
//!
//! A central repository for named drawing files, reached over raw TCP:
//! - One command per connection (`list`, `save`, `load`)
//! - Length-prefixed binary framing
//! - Bounded worker pool with explicit overload rejection
//! - Atomic, last-writer-wins saves into a flat storage directory
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Client Façade                           │
//! │            (fresh connection per call, timeouts)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ TCP
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Listener / Dispatcher                        │
//! │           (acceptor → bounded worker pool)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Connection Handler                           │
//! │              (one command, then close)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │   Storage     │
//!               │  Directory    │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod storage;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VaultError, Result};
pub use config::{ClientConfig, Config, DEFAULT_PORT};
pub use client::Client;
pub use network::{Server, ShutdownHandle};
pub use storage::StorageDir;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DrawVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
