//! PGN storage module
//!
//! All filesystem access for stored games goes through [`PgnStore`]: listing
//! the flat storage directory, reading one file, and persisting uploads.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::naming;
use crate::config::StorageConfig;
use crate::logger;

/// Listing entry for one stored game file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file_name: String,
    pub friendly_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Check that `name` is a single plain path segment
///
/// Rejects empty names, `.`, `..`, and anything containing a path separator
/// or NUL, so joining it onto the storage directory cannot escape it.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Handle on the storage directory
#[derive(Debug, Clone)]
pub struct PgnStore {
    dir: PathBuf,
    extension: String,
}

impl PgnStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.dir, config.extension.trim_start_matches('.'))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })
    }

    /// Describe every stored file carrying the recognized extension, sorted
    /// by file name
    pub async fn list(&self) -> Result<Vec<FileDescriptor>, StorageError> {
        let read_dir_err = |source: io::Error| StorageError::ReadDir {
            path: self.dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(read_dir_err)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            // Non-UTF-8 names cannot be served back through a URL path
            let Some(file_name) = entry.file_name().to_str().map(ToString::to_string) else {
                continue;
            };
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    logger::log_warning(&format!("Skipping {}: {e}", path.display()));
                    continue;
                }
            }

            let friendly_name = naming::friendly_name(&file_name, &self.extension);
            files.push(FileDescriptor {
                file_name,
                friendly_name,
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }

    /// Read a stored file in full
    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(file_name)?;
        fs::read(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(file_name.to_string())
            } else {
                StorageError::Io { path, source }
            }
        })
    }

    /// Start writing an upload named `file_name`
    ///
    /// Bytes land in a hidden temporary file next to the target and only
    /// replace the target on [`PendingUpload::commit`].
    pub async fn begin_upload(&self, file_name: &str) -> Result<PendingUpload, StorageError> {
        let target = self.path_for(file_name)?;
        // Random suffix per upload, so concurrent uploads of one name never share a file
        let prefix = format!(".{file_name}.");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".part");
        // Stored files keep the usual mode instead of the 0600 temp default
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o644));
        }
        let named = builder
            .tempfile_in(&self.dir)
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let (file, temp) = named.into_parts();

        Ok(PendingUpload {
            file: fs::File::from_std(file),
            temp,
            target,
            written: 0,
        })
    }

    /// Store `data` under `file_name`, replacing any existing file
    #[cfg(test)]
    pub async fn save(&self, file_name: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut upload = self.begin_upload(file_name).await?;
        if let Err(e) = upload.write_chunk(data).await {
            upload.abort().await;
            return Err(e);
        }
        upload.commit().await
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_file_name(file_name) {
            return Err(StorageError::InvalidName(file_name.to_string()));
        }
        Ok(self.dir.join(file_name))
    }
}

/// Upload in progress, backed by a temporary file in the storage directory
///
/// The temporary file is deleted when the upload is dropped without a
/// successful [`PendingUpload::commit`].
#[derive(Debug)]
pub struct PendingUpload {
    file: fs::File,
    temp: TempPath,
    target: PathBuf,
    written: u64,
}

impl PendingUpload {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| StorageError::Io {
                path: self.temp.to_path_buf(),
                source,
            })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Flush and move the temporary file over the target
    pub async fn commit(self) -> Result<(), StorageError> {
        let Self {
            file, temp, target, ..
        } = self;

        if let Err(source) = file.sync_all().await {
            return Err(StorageError::Io {
                path: temp.to_path_buf(),
                source,
            });
        }
        drop(file);

        // On failure the returned TempPath is dropped, which removes the file
        temp.persist(&target).map_err(|e| StorageError::Io {
            path: target.clone(),
            source: e.error,
        })
    }

    /// Discard the temporary file
    pub async fn abort(self) {
        drop(self.file);
        let path = self.temp.to_path_buf();
        if let Err(e) = self.temp.close() {
            logger::log_warning(&format!(
                "Failed to remove temporary upload {}: {e}",
                path.display()
            ));
        }
    }
}
