//! cams.json persistence
//!
//! The file holds `{version, updatedAt, cams}`. Reads never fail: a missing or
//! malformed file reads as an empty list. Writes replace the whole file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{StreamDescriptor, StreamList};

/// Errors from store mutations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Stream '{0}' not found")]
    NotFound(String),
    #[error("Invalid stream: {0}")]
    Invalid(String),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode stream list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON-file backed stream list
#[derive(Debug)]
pub struct CamStore {
    path: PathBuf,
    cache: Mutex<Option<(Option<SystemTime>, StreamList)>>,
}

impl CamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, substituting an empty list on any problem
    pub fn read(&self) -> StreamList {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "cams file unreadable");
                return StreamList::empty();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed cams file");
                StreamList::empty()
            }
        }
    }

    /// Like [`read`](Self::read) but only re-parses when the mtime changes
    pub fn read_cached(&self) -> StreamList {
        let mtime = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok();

        let Ok(mut cache) = self.cache.lock() else {
            return self.read();
        };

        if let Some((cached_mtime, list)) = cache.as_ref() {
            if mtime.is_some() && *cached_mtime == mtime {
                return list.clone();
            }
        }

        let list = self.read();
        *cache = Some((mtime, list.clone()));
        list
    }

    /// Replace the whole list, stamping `updatedAt`
    pub fn write(&self, list: &StreamList) -> Result<StreamList, StoreError> {
        let out = StreamList {
            version: list.version.max(1),
            updated_at: Utc::now(),
            streams: list.streams.clone(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&out)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
        Ok(out)
    }

    /// Replace the stream with the same id, or append it
    pub fn upsert(&self, stream: StreamDescriptor) -> Result<StreamList, StoreError> {
        stream.validate().map_err(StoreError::Invalid)?;

        let mut list = self.read();
        match list.position(&stream.id) {
            Some(i) => list.streams[i] = stream,
            None => list.streams.push(stream),
        }
        self.write(&list)
    }

    pub fn delete(&self, id: &str) -> Result<StreamList, StoreError> {
        let mut list = self.read();
        let before = list.len();
        list.streams.retain(|s| s.id != id);
        if list.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.write(&list)
    }
}
