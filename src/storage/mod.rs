//! Storage Module
//!
//! Server-side flat namespace of persisted drawing files.
//!
//! ## Layout
//! ```text
//! {storage_dir}/
//!   ├── house.xml
//!   ├── garden.XML
//!   └── .upload-<pid>-<seq>.tmp   (in-flight save, never listed)
//! ```
//!
//! ## Write Policy
//! Last writer wins. A save is written to a temp file, fsynced and renamed
//! over the target under the name's write lock.

mod directory;
mod locks;

pub use directory::{is_listed, validate_name, StorageDir, LISTED_SUFFIX, MAX_NAME_LEN};
pub use locks::NameLocks;
