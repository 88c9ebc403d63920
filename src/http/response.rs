//! HTTP response building module
//!
//! Provides builders for the responses the PGN API sends, decoupled from the
//! handlers that decide which one to send.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS};
use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, SERVER};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::HttpConfig;

const NOT_FOUND_PAGE: &str = "<h1>Page not found!</h1>";

/// Build JSON response
pub fn build_json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string(body) {
        Ok(j) => j,
        Err(e) => {
            log_build_error("JSON body", &e);
            return build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build `{"error": message}` JSON response
pub fn build_error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build `{"message": message}` JSON response
pub fn build_message_response(message: &str) -> Response<Full<Bytes>> {
    build_json_response(StatusCode::OK, &serde_json::json!({ "message": message }))
}

/// Build plain text response carrying raw file content
pub fn build_text_response(data: Bytes, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("204", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 page for unmatched routes
pub fn build_not_found_page() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/html")
        .header("my-own-header", "hello-world")
        .body(Full::new(Bytes::from_static(NOT_FOUND_PAGE.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from_static(NOT_FOUND_PAGE.as_bytes())))
        })
}

/// Build health check response
pub fn build_health_response(status: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache")
        .body(Full::new(Bytes::from(status.to_string())))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from(status.to_string())))
        })
}

/// Add the cross-origin and `Server` headers every response carries
pub fn apply_common_headers(response: &mut Response<Full<Bytes>>, http: &HttpConfig) {
    let headers = response.headers_mut();
    for (name, value) in [
        (ACCESS_CONTROL_ALLOW_ORIGIN, &http.cors_allow_origin),
        (ACCESS_CONTROL_ALLOW_METHODS, &http.cors_allow_methods),
        (ACCESS_CONTROL_ALLOW_HEADERS, &http.cors_allow_headers),
        (SERVER, &http.server_name),
    ] {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(name, v);
            }
            Err(e) => log_build_error(name.as_str(), &e),
        }
    }
}

/// Log response build error
fn log_build_error(what: &str, error: &impl std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}
