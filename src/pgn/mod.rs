//! PGN game file module
//!
//! Domain layer with no HTTP types: file naming conventions and the storage
//! directory.

pub mod naming;
pub mod storage;

pub use storage::{FileDescriptor, PgnStore, StorageError};
