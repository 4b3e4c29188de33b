use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::atomic_io::write_bytes_atomic;
use super::envelope::{decode_envelope, encode_envelope};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no save data at {path}")]
    NoSaveData { path: PathBuf },
    #[error("save data at {path} is corrupt: {message}")]
    CorruptSaveData { path: PathBuf, message: String },
    #[error("failed to read/write save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode save payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to frame save payload: {0}")]
    Frame(String),
}

impl SaveError {
    pub fn is_no_save_data(&self) -> bool {
        matches!(self, Self::NoSaveData { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptSaveData { .. })
    }
}

/// Single-slot save file. Every `persist` replaces the previous content.
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(saves_dir: &Path, file_name: &str) -> Self {
        Self {
            path: saves_dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn persist<T: Serialize>(&self, record: &T) -> Result<(), SaveError> {
        let payload = serde_json::to_vec(record).map_err(SaveError::Encode)?;
        let bytes = encode_envelope(&payload).map_err(SaveError::Frame)?;

        with_single_retry("persist", &self.path, || {
            write_bytes_atomic(&self.path, &bytes)
        })
        .map_err(|source| SaveError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "save_written"
        );
        Ok(())
    }

    pub fn restore<T: DeserializeOwned>(&self) -> Result<T, SaveError> {
        let bytes = match with_single_retry("restore", &self.path, || fs::read(&self.path)) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(SaveError::NoSaveData {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(SaveError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let payload = decode_envelope(&bytes).map_err(|message| self.corrupt(message))?;
        let record = parse_payload(payload).map_err(|message| self.corrupt(message))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "save_read");
        Ok(record)
    }

    /// Deletes the slot. Returns whether a file was actually removed.
    pub fn discard(&self) -> Result<bool, SaveError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "save_discarded");
                Ok(true)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SaveError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn corrupt(&self, message: String) -> SaveError {
        SaveError::CorruptSaveData {
            path: self.path.clone(),
            message,
        }
    }
}

fn parse_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, String> {
    let mut deserializer = serde_json::Deserializer::from_slice(payload);
    let record = match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(record) => record,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                return Err(format!("parse save json: {source}"));
            }
            return Err(format!("parse save json at {path}: {source}"));
        }
    };
    deserializer
        .end()
        .map_err(|error| format!("parse save json: {error}"))?;
    Ok(record)
}

/// Transient I/O failures get exactly one more attempt. A missing file is not
/// transient.
fn with_single_retry<R>(
    operation: &'static str,
    path: &Path,
    mut attempt: impl FnMut() -> io::Result<R>,
) -> io::Result<R> {
    match attempt() {
        Ok(value) => Ok(value),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Err(error),
        Err(error) => {
            warn!(
                operation,
                path = %path.display(),
                error = %error,
                "save_io_retry"
            );
            attempt()
        }
    }
}
