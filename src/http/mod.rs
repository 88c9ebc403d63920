//! HTTP protocol layer module
//!
//! Response builders and the headers shared by every response, decoupled
//! from the PGN handlers.

pub mod response;

// Re-export commonly used builders
pub use response::{
    apply_common_headers, build_error_response, build_health_response, build_json_response,
    build_message_response, build_not_found_page, build_preflight_response, build_text_response,
};
