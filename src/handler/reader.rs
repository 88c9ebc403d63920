//! Single file module
//!
//! `GET /api/pgn-files/{fileName}`: return one stored file verbatim.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::pgn::StorageError;

/// Last segment of the request path, the requested file name
fn file_name_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// Decode `%XX` escapes in a path segment
///
/// Malformed escapes are kept as-is; `None` when the result is not UTF-8.
/// `+` stays a plus sign, it only means space in query strings.
fn percent_decode(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte)
        .to_digit(16)
        .and_then(|d| u8::try_from(d).ok())
}

/// Handle a file read request
pub async fn read_file(path: &str, is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    let raw_name = file_name_from_path(path);
    let Some(file_name) = percent_decode(raw_name) else {
        logger::log_warning(&format!("Rejected non UTF-8 file name in {path}"));
        return http::build_error_response(StatusCode::BAD_REQUEST, "Invalid file name");
    };

    match state.store.read(&file_name).await {
        Ok(data) => http::build_text_response(Bytes::from(data), is_head),
        Err(StorageError::InvalidName(name)) => {
            logger::log_warning(&format!("Rejected file name {name:?} in {path}"));
            http::build_error_response(StatusCode::BAD_REQUEST, "Invalid file name")
        }
        Err(StorageError::NotFound(_)) => {
            http::build_error_response(StatusCode::NOT_FOUND, "File not found")
        }
        Err(e) => {
            logger::log_error(&e.to_string());
            http::build_error_response(StatusCode::NOT_FOUND, "File not found")
        }
    }
}
