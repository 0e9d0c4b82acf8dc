//! Blob upload contract for file and media fields.

use crate::error::BlobError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Uploads bytes and hands back a URL the record can store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, BlobError>;
}

/// A stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob store that keeps uploads in memory and returns `memory://` URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        if path.trim_matches('/').is_empty() {
            return Err(BlobError::Rejected {
                path: path.to_string(),
                reason: "empty path".into(),
            });
        }

        let path = path.trim_matches('/').to_string();
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.clone(),
                StoredBlob {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(format!("memory://{}", path))
    }
}
