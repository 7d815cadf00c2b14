//! File-based bucket for persistent storage.

use crate::bucket::Bucket;
use crate::error::{BucketError, BucketResult};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Extension used for value files.
const VALUE_EXT: &str = "bin";

/// A directory-backed bucket.
///
/// Each key is stored in its own file inside the bucket directory.
/// Values survive process restarts.
///
/// # Durability
///
/// `set_item` writes the value to a temporary file, syncs it, and renames it
/// over the previous value, so a crash leaves either the old or the new value
/// in place, never a torn one.
///
/// # Keys
///
/// Keys must be non-empty, must not start with `.`, and may only contain
/// ASCII letters, digits, `-`, `_` and `.`.
///
/// # Example
///
/// ```no_run
/// use orrery_bucket::{Bucket, FileBucket};
/// use std::path::Path;
///
/// # async fn demo() -> orrery_bucket::BucketResult<()> {
/// let bucket = FileBucket::open(Path::new("state")).await?;
/// bucket.set_item("main-log", vec![1, 2, 3]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileBucket {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBucket {
    /// Opens a bucket rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: &Path) -> BucketResult<Self> {
        fs::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the bucket directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> BucketResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(BucketError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{key}.{VALUE_EXT}")))
    }
}

#[async_trait]
impl Bucket for FileBucket {
    async fn get_item(&self, key: &str) -> BucketResult<Option<Vec<u8>>> {
        let path = self.value_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: Vec<u8>) -> BucketResult<()> {
        let path = self.value_path(key)?;
        let tmp = path.with_extension("tmp");

        let _guard = self.write_lock.lock().await;
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&value).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;

        tracing::trace!(key, bytes = value.len(), "bucket item written");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> BucketResult<()> {
        let path = self.value_path(key)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_missing_key_is_none() {
        let dir = tempdir().unwrap();
        let bucket = FileBucket::open(dir.path()).await.unwrap();
        assert_eq!(bucket.get_item("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_set_get_remove() {
        let dir = tempdir().unwrap();
        let bucket = FileBucket::open(dir.path()).await.unwrap();

        bucket.set_item("queue", b"abc".to_vec()).await.unwrap();
        assert_eq!(bucket.get_item("queue").await.unwrap(), Some(b"abc".to_vec()));

        bucket.remove_item("queue").await.unwrap();
        assert_eq!(bucket.get_item("queue").await.unwrap(), None);
        bucket.remove_item("queue").await.unwrap();
    }

    #[tokio::test]
    async fn file_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let bucket = FileBucket::open(dir.path()).await.unwrap();
            bucket.set_item("log", vec![9, 8, 7]).await.unwrap();
        }

        let reopened = FileBucket::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get_item("log").await.unwrap(), Some(vec![9, 8, 7]));
    }

    #[tokio::test]
    async fn file_creates_nested_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let bucket = FileBucket::open(&nested).await.unwrap();
        bucket.set_item("k", vec![1]).await.unwrap();
        assert!(nested.join("k.bin").exists());
    }

    #[tokio::test]
    async fn file_rejects_invalid_keys() {
        let dir = tempdir().unwrap();
        let bucket = FileBucket::open(dir.path()).await.unwrap();

        for key in ["", "../escape", ".hidden", "a/b", "sp ace"] {
            let result = bucket.set_item(key, vec![1]).await;
            assert!(
                matches!(result, Err(BucketError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }
}
