//! Request handler module
//!
//! Route dispatch plus the three PGN endpoints: listing, single file reads
//! and multipart uploads.

pub mod listing;
pub mod reader;
pub mod router;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;
