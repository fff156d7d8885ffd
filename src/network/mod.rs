//! Network Module
//!
//! TCP server and connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Bounded worker pool; a saturated pool answers OVERLOADED
//! - One command per connection, then the socket is closed

mod server;
mod connection;
mod pool;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, State};
pub use pool::WorkerPool;
