//! Buckets with injectable failures.

use async_trait::async_trait;
use orrery_bucket::{Bucket, BucketError, BucketResult, InMemoryBucket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory bucket whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FailingBucket {
    inner: InMemoryBucket,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FailingBucket {
    /// Creates a bucket that succeeds until told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the wrapped bucket.
    pub fn inner(&self) -> &InMemoryBucket {
        &self.inner
    }
}

#[async_trait]
impl Bucket for FailingBucket {
    async fn get_item(&self, key: &str) -> BucketResult<Option<Vec<u8>>> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: Vec<u8>) -> BucketResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BucketError::Unavailable(format!("write to {key} rejected")));
        }
        self.inner.set_item(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> BucketResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BucketError::Unavailable(format!("removal of {key} rejected")));
        }
        self.inner.remove_item(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_fail_on_demand() {
        let bucket = FailingBucket::new();
        bucket.set_item("log", vec![1]).await.unwrap();
        assert_eq!(bucket.writes(), 1);

        bucket.fail_writes(true);
        assert!(matches!(
            bucket.set_item("log", vec![2]).await,
            Err(BucketError::Unavailable(_))
        ));
        assert_eq!(bucket.get_item("log").await.unwrap(), Some(vec![1]));
    }
}
