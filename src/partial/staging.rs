//! Durable staging of fragment artifacts
//!
//! Every fragment leaves two artifacts behind until its article is complete: a
//! JSON metadata record and the raw payload blob. Both are write-once. The
//! filesystem backend lays them out as
//!
//! ```text
//! <dir>/<escaped id>-part_<n>-article.json
//! <dir>/<escaped id>-part_<n>-attachment
//! ```
//!
//! so that fragments staged before a restart are picked up afterwards.

use crate::error::{ArchiveError, Result};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Which of a fragment's two artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON metadata record
    Metadata,
    /// Raw payload bytes
    Attachment,
}

impl ArtifactKind {
    fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Metadata => "article.json",
            ArtifactKind::Attachment => "attachment",
        }
    }
}

/// Address of one staged artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagingKey {
    pub id: String,
    pub number: u32,
    pub kind: ArtifactKind,
}

impl StagingKey {
    pub fn new(id: &str, number: u32, kind: ArtifactKind) -> Self {
        Self {
            id: id.to_string(),
            number,
            kind,
        }
    }

    /// File name used by [`FsStaging`]
    pub fn file_name(&self) -> String {
        format!(
            "{}-part_{}-{}",
            escape_id(&self.id),
            self.number,
            self.kind.suffix()
        )
    }
}

/// Keep the id readable while making it safe as a single path component
///
/// Bytes outside `[A-Za-z0-9._@+=-]` become `%XX`, so distinct ids never collide.
fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'@' | b'+' | b'=' | b'-' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Keyed byte storage for fragment artifacts
#[allow(async_fn_in_trait)]
pub trait StagingStore {
    /// Store `bytes` under `key` unless something is already there
    ///
    /// Returns `false` when the key existed; the stored bytes are left untouched.
    async fn put(&self, key: &StagingKey, bytes: &[u8]) -> Result<bool>;

    /// Whether `key` holds an artifact
    async fn exists(&self, key: &StagingKey) -> Result<bool>;

    /// Read the artifact at `key`, `None` when absent
    async fn get(&self, key: &StagingKey) -> Result<Option<Vec<u8>>>;

    /// Remove the artifact at `key`; returns whether one was removed
    async fn delete(&self, key: &StagingKey) -> Result<bool>;
}

/// Filesystem staging under one directory
#[derive(Debug, Clone)]
pub struct FsStaging {
    dir: PathBuf,
}

impl FsStaging {
    /// Stage under `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &StagingKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

fn staging_error(action: &str, path: &Path, e: std::io::Error) -> ArchiveError {
    ArchiveError::Staging(format!("{} {}: {}", action, path.display(), e))
}

impl StagingStore for FsStaging {
    async fn put(&self, key: &StagingKey, bytes: &[u8]) -> Result<bool> {
        let path = self.path(key);
        if self.exists(key).await? {
            debug!("Staged artifact {} already present", path.display());
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| staging_error("create", &self.dir, e))?;

        // Written aside and renamed so a crash never leaves a half artifact behind
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", key.file_name(), uuid::Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| staging_error("create", &tmp, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| staging_error("write", &tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| staging_error("sync", &tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| staging_error("rename", &path, e))?;

        trace!("Staged {} ({} bytes)", path.display(), bytes.len());
        Ok(true)
    }

    async fn exists(&self, key: &StagingKey) -> Result<bool> {
        let path = self.path(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(staging_error("stat", &path, e)),
        }
    }

    async fn get(&self, key: &StagingKey) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(staging_error("read", &path, e)),
        }
    }

    async fn delete(&self, key: &StagingKey) -> Result<bool> {
        let path = self.path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                trace!("Deleted {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(staging_error("delete", &path, e)),
        }
    }
}

/// In-memory staging, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStaging {
    artifacts: Mutex<HashMap<StagingKey, Vec<u8>>>,
}

impl MemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged artifacts
    pub async fn len(&self) -> usize {
        self.artifacts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.lock().await.is_empty()
    }
}

impl StagingStore for MemoryStaging {
    async fn put(&self, key: &StagingKey, bytes: &[u8]) -> Result<bool> {
        let mut artifacts = self.artifacts.lock().await;
        if artifacts.contains_key(key) {
            return Ok(false);
        }
        artifacts.insert(key.clone(), bytes.to_vec());
        Ok(true)
    }

    async fn exists(&self, key: &StagingKey) -> Result<bool> {
        Ok(self.artifacts.lock().await.contains_key(key))
    }

    async fn get(&self, key: &StagingKey) -> Result<Option<Vec<u8>>> {
        Ok(self.artifacts.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &StagingKey) -> Result<bool> {
        Ok(self.artifacts.lock().await.remove(key).is_some())
    }
}

impl<S: StagingStore> StagingStore for &S {
    async fn put(&self, key: &StagingKey, bytes: &[u8]) -> Result<bool> {
        (**self).put(key, bytes).await
    }

    async fn exists(&self, key: &StagingKey) -> Result<bool> {
        (**self).exists(key).await
    }

    async fn get(&self, key: &StagingKey) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &StagingKey) -> Result<bool> {
        (**self).delete(key).await
    }
}
