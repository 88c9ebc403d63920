//! Upload module
//!
//! `POST /api/pgn-files-save`: store the `file` field of a multipart form in
//! the storage directory under the client-supplied file name.

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{HeaderMap, Request, Response, StatusCode};

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::pgn::{PgnStore, StorageError};

const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("expected multipart/form-data with a boundary")]
    MissingBoundary,
    #[error("malformed multipart body: {0}")]
    Malformed(#[from] multer::Error),
    #[error("no 'file' field in upload")]
    MissingFile,
    #[error("uploaded file has no name")]
    MissingFileName,
    #[error("upload exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UploadError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingBoundary
            | Self::Malformed(_)
            | Self::MissingFile
            | Self::MissingFileName
            | Self::Storage(StorageError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client; I/O details stay in the log
    fn client_message(&self) -> String {
        match self {
            Self::Storage(StorageError::InvalidName(_)) => "Invalid file name".to_string(),
            Self::Storage(_) => "Failed to save file".to_string(),
            other => other.to_string(),
        }
    }
}

/// Handle an upload request
pub async fn save_file<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match receive_upload(req, &state.store, state.config.http.max_body_size).await {
        Ok((file_name, bytes)) => {
            logger::log_upload_saved(&file_name, bytes);
            http::build_message_response("File uploaded successfully")
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                logger::log_error(&format!("Upload failed: {e}"));
            } else {
                logger::log_warning(&format!("Upload rejected: {e}"));
            }
            http::build_error_response(status, &e.client_message())
        }
    }
}

/// Stream the first `file` field into the store, returning its name and size
async fn receive_upload<B>(
    req: Request<B>,
    store: &PgnStore,
    max_body_size: u64,
) -> Result<(String, u64), UploadError>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if content_length(req.headers()).is_some_and(|len| len > max_body_size) {
        return Err(UploadError::TooLarge {
            limit: max_body_size,
        });
    }

    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or(UploadError::MissingBoundary)?;

    let mut multipart = multer::Multipart::new(req.into_body().into_data_stream(), boundary);

    while let Some(field) = multipart.next_field().await? {
        // Unread fields are skipped by the next `next_field` call
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(client_file_name)
            .filter(|name| !name.is_empty())
            .ok_or(UploadError::MissingFileName)?;

        let bytes = store_field(field, &file_name, store, max_body_size).await?;
        return Ok((file_name, bytes));
    }

    Err(UploadError::MissingFile)
}

async fn store_field(
    mut field: multer::Field<'_>,
    file_name: &str,
    store: &PgnStore,
    max_body_size: u64,
) -> Result<u64, UploadError> {
    let mut upload = store.begin_upload(file_name).await?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                upload.abort().await;
                return Err(e.into());
            }
        };

        if upload.written() + chunk.len() as u64 > max_body_size {
            upload.abort().await;
            return Err(UploadError::TooLarge {
                limit: max_body_size,
            });
        }

        if let Err(e) = upload.write_chunk(&chunk).await {
            upload.abort().await;
            return Err(e.into());
        }
    }

    let written = upload.written();
    upload.commit().await?;
    Ok(written)
}

/// Base name of a client-supplied file name
///
/// Some clients send a full local path; only the last component is kept.
fn client_file_name(raw: &str) -> String {
    raw.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
