//! Blob store collaborator - "store bytes, get back a locator".
//!
//! The core never inspects image bytes beyond delegating to this trait.
//! Deletions that accompany a database transaction are best-effort: a failed
//! blob delete is logged and recorded as a [`blob_cleanup_task`] row so an
//! external sweep can reclaim the orphan later, and it never aborts the
//! surrounding transaction.
//!
//! [`blob_cleanup_task`]: crate::entities::blob_cleanup_task

use crate::{
    entities::blob_cleanup_task,
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, Set, prelude::*};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::warn;

/// Binary object storage consumed by the coordinator.
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Stores bytes and returns a locator for later retrieval or deletion.
    async fn store(&self, bytes: &[u8], content_type: &str, path_hint: &str) -> Result<String>;

    /// Deletes a previously stored blob.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Resolves a locator to a public URL.
    fn resolve(&self, path: &str) -> String;
}

/// Attempts a blob deletion as a best-effort companion to a database
/// transaction. On failure the orphan is recorded on `conn` (usually the
/// open transaction) and the error is absorbed.
pub async fn best_effort_delete<B, C>(blobs: &B, conn: &C, path: &str, context: &str) -> Result<()>
where
    B: BlobStore,
    C: ConnectionTrait,
{
    if let Err(e) = blobs.delete(path).await {
        warn!(
            "Blob delete failed for '{}' during {}: {}; recording cleanup task",
            path, context, e
        );
        let task = blob_cleanup_task::ActiveModel {
            storage_path: Set(path.to_string()),
            reason: Set(context.to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        task.insert(conn).await?;
    }
    Ok(())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Filesystem-backed blob store rooted at a configured directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl BlobStore for LocalBlobStore {
    async fn store(&self, bytes: &[u8], content_type: &str, path_hint: &str) -> Result<String> {
        let hint = super::slugify(path_hint);
        let hint = if hint.is_empty() { "blob".to_string() } else { hint };
        let path = format!(
            "{}-{}.{}",
            hint,
            chrono::Utc::now().timestamp_millis(),
            extension_for(content_type)
        );
        let full = self.full_path(&path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, bytes)?;
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        std::fs::remove_file(self.full_path(path)).map_err(|e| Error::BlobStore {
            message: format!("failed to delete '{path}': {e}"),
        })
    }

    fn resolve(&self, path: &str) -> String {
        format!("/media/{path}")
    }
}

/// In-memory blob store for tests, with a switch to make deletions fail so
/// the best-effort policy can be exercised.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    counter: AtomicU64,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `delete` call fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// True when no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a locator is present.
    pub fn contains(&self, path: &str) -> bool {
        self.blobs.lock().map(|b| b.contains_key(path)).unwrap_or(false)
    }
}

impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: &[u8], content_type: &str, path_hint: &str) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = format!("{path_hint}-{n}.{}", extension_for(content_type));
        let mut blobs = self.blobs.lock().map_err(|_| Error::BlobStore {
            message: "memory store poisoned".to_string(),
        })?;
        blobs.insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::BlobStore {
                message: format!("simulated delete failure for '{path}'"),
            });
        }
        let mut blobs = self.blobs.lock().map_err(|_| Error::BlobStore {
            message: "memory store poisoned".to_string(),
        })?;
        blobs.remove(path).map(|_| ()).ok_or(Error::BlobStore {
            message: format!("no such blob '{path}'"),
        })
    }

    fn resolve(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}
