//! Directory listing module
//!
//! `GET /api/pgn-files`: search and paginate the stored game files.

use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};

use crate::config::{AppState, ListingConfig};
use crate::http;
use crate::logger;
use crate::pgn::FileDescriptor;

/// Raw query parameters, kept as strings so bad numbers fall back to defaults
#[derive(Debug, Default, Deserialize)]
struct RawQuery {
    search: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

/// Validated listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Case-insensitive substring filter on the friendly name
    pub search: Option<String>,
    /// 1-based page number
    pub page: usize,
    /// Page size, always at least 1
    pub limit: usize,
}

/// One page of listing results
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub files: Vec<FileDescriptor>,
    pub total_pages: usize,
    pub current_page: usize,
}

impl ListingQuery {
    /// Parse a raw query string
    ///
    /// Missing, non-numeric or zero `page`/`limit` values use the defaults
    /// (page 1, `default_limit`); `limit` is capped at `max_limit`.
    pub fn from_query(query: Option<&str>, config: ListingConfig) -> Self {
        let raw: RawQuery = match serde_urlencoded::from_str(query.unwrap_or_default()) {
            Ok(raw) => raw,
            Err(e) => {
                logger::log_warning(&format!("Ignoring malformed listing query: {e}"));
                RawQuery::default()
            }
        };

        let max_limit = config.max_limit.max(1);
        let limit = parse_positive(raw.limit.as_deref())
            .unwrap_or(config.default_limit)
            .clamp(1, max_limit);

        Self {
            search: raw.search.filter(|s| !s.is_empty()),
            page: parse_positive(raw.page.as_deref()).unwrap_or(1),
            limit,
        }
    }

    fn matches(&self, file: &FileDescriptor) -> bool {
        self.search.as_ref().map_or(true, |needle| {
            file.friendly_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }
}

fn parse_positive(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Filter `files` by the query's search term and cut out the requested page
///
/// `total_pages` counts every match, before slicing.
pub fn paginate(files: Vec<FileDescriptor>, query: &ListingQuery) -> ListingPage {
    let matching: Vec<FileDescriptor> = files.into_iter().filter(|f| query.matches(f)).collect();
    let total_pages = matching.len().div_ceil(query.limit);
    let offset = (query.page - 1).saturating_mul(query.limit);

    ListingPage {
        files: matching.into_iter().skip(offset).take(query.limit).collect(),
        total_pages,
        current_page: query.page,
    }
}

/// Handle a listing request
pub async fn list_files(query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    let query = ListingQuery::from_query(query, state.config.listing);

    match state.store.list().await {
        Ok(files) => http::build_json_response(StatusCode::OK, &paginate(files, &query)),
        Err(e) => {
            logger::log_error(&e.to_string());
            http::build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read directory")
        }
    }
}
