//! In-Memory Resource Store
//!
//! Implements `ResourceChannel` on top of a content map keyed by SHA-256.
//! Several stores can share one map to stand in for a resource network
//! that two nodes both reach.

use crate::domain::{ContentHash, ResourceError};
use crate::ports::outbound::{ResourceChannel, TransferOptions};
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Content shared between stores.
pub type SharedContent = Arc<RwLock<HashMap<ContentHash, Vec<u8>>>>;

/// Content-addressed store rooted at a local directory.
pub struct InMemoryResourceStore {
    /// Root for scratch and download directories.
    root: PathBuf,
    /// Uploaded content.
    content: SharedContent,
    fail_uploads: AtomicBool,
    fail_downloads: AtomicBool,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

impl InMemoryResourceStore {
    /// Create a store with its own content map.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_content(root, SharedContent::default())
    }

    /// Create a store backed by an existing content map.
    pub fn with_content(root: impl Into<PathBuf>, content: SharedContent) -> Self {
        Self {
            root: root.into(),
            content,
            fail_uploads: AtomicBool::new(false),
            fail_downloads: AtomicBool::new(false),
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Handle to the content map, for wiring a second store.
    pub fn content(&self) -> SharedContent {
        Arc::clone(&self.content)
    }

    /// Store raw bytes directly and return their address.
    pub fn insert(&self, bytes: impl Into<Vec<u8>>) -> ContentHash {
        let bytes = bytes.into();
        let hash = content_hash(&bytes);
        self.content.write().insert(hash.clone(), bytes);
        hash
    }

    /// Replace what is stored under `hash`.
    pub fn overwrite(&self, hash: &ContentHash, bytes: impl Into<Vec<u8>>) {
        self.content.write().insert(hash.clone(), bytes.into());
    }

    /// Make every upload fail.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every download fail.
    pub fn set_fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    /// Number of upload calls so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Number of download calls so far.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Files currently in the scratch directory for `label`.
    pub fn scratch_files(&self, label: &str) -> Vec<PathBuf> {
        list_files(&self.root.join(label))
    }

    /// Files currently in the download directory for `label`.
    pub fn downloaded_files(&self, label: &str) -> Vec<PathBuf> {
        list_files(&self.download_dir(label))
    }

    fn download_dir(&self, label: &str) -> PathBuf {
        self.root.join("downloads").join(label)
    }
}

/// SHA-256 of `bytes`, hex encoded.
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash::new(hex::encode(hasher.finalize()))
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ResourceChannel for InMemoryResourceStore {
    fn scratch_dir(&self, label: &str) -> Result<PathBuf, ResourceError> {
        let dir = self.root.join(label);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    async fn upload(
        &self,
        path: &Path,
        label: &str,
        absolute: bool,
        options: TransferOptions,
    ) -> Result<ContentHash, ResourceError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ResourceError::Rejected("uploads disabled".to_string()));
        }
        if !absolute && path.is_absolute() {
            return Err(ResourceError::Rejected(format!(
                "absolute path {} not allowed",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let hash = self.insert(bytes);

        debug!(
            label,
            hash = %hash,
            peers = options.peers.len(),
            "[resources] Stored {}",
            path.display()
        );
        Ok(hash)
    }

    async fn download(
        &self,
        hash: &ContentHash,
        label: &str,
        options: TransferOptions,
    ) -> Result<Vec<PathBuf>, ResourceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(ResourceError::Rejected("downloads disabled".to_string()));
        }

        let bytes = self
            .content
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(hash.clone()))?;

        let dir = self.download_dir(label);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(Uuid::new_v4().to_string());
        tokio::fs::write(&path, bytes).await?;

        debug!(
            label,
            hash = %hash,
            peers = options.peers.len(),
            "[resources] Fetched into {}",
            path.display()
        );
        Ok(vec![path])
    }
}
