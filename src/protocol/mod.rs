//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V2)
//!
//! Every connection carries exactly one command and is closed afterwards.
//!
//! ### Greeting (server → client, on assignment to a worker)
//! ```text
//! ┌────────────┬───────────┐
//! │Version (1) │ Status(1) │
//! └────────────┴───────────┘
//! ```
//!
//! ### Commands (client → server)
//! - `"list"`
//! - `"save"` + name string + blob
//! - `"load"` + name string
//!
//! ### Replies (server → client)
//! - list: status, count (4), count × name string
//! - save: status
//! - load: status, blob when found
//! - unknown command: nothing, the connection is closed
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: REJECTED (invalid filename)
//! - 0x03: OVERLOADED
//! - 0x04: ERROR (followed by a message string)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, encode_command, read_command, write_command};
pub use response::{Greeting, Status, PROTOCOL_VERSION};
pub use codec::{
    put_blob, put_string,
    read_blob, read_greeting, read_status, read_string, read_u32,
    write_blob, write_greeting, write_status, write_string, write_u32,
    MAX_BLOB_SIZE, MAX_STRING_LEN,
};
