//! Routing module
//!
//! Provides the ordered route table used by the request router:
//! - Method matching (any, or a fixed set)
//! - Path matching (exact, prefix, or any)
//! - First-match-wins resolution with a not-found fallback

mod matcher;
mod table;

pub use table::{Endpoint, RouteTable};
