//! Bucket trait definition.

use crate::error::{BucketError, BucketResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An asynchronous key-value store used for durability.
///
/// Buckets are **opaque byte stores**. The transform log and the action queue
/// each own one key in a bucket and rewrite the whole value on every
/// structural change.
///
/// # Invariants
///
/// - `get_item` returns exactly the bytes last written with `set_item`
/// - `get_item` returns `None` for keys never written or since removed
/// - A completed `set_item` survives for as long as the bucket's medium does
/// - Buckets must be `Send + Sync` to be shared across tasks
///
/// # Implementors
///
/// - [`super::InMemoryBucket`] - For testing
/// - [`super::FileBucket`] - For persistent storage
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    async fn get_item(&self, key: &str) -> BucketResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn set_item(&self, key: &str, value: Vec<u8>) -> BucketResult<()>;

    /// Removes the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    async fn remove_item(&self, key: &str) -> BucketResult<()>;
}

/// Reads and decodes a CBOR value stored under `key`.
pub async fn get_value<T, B>(bucket: &B, key: &str) -> BucketResult<Option<T>>
where
    T: DeserializeOwned,
    B: Bucket + ?Sized,
{
    match bucket.get_item(key).await? {
        Some(bytes) => ciborium::from_reader(bytes.as_slice())
            .map(Some)
            .map_err(|e| BucketError::codec(key, e)),
        None => Ok(None),
    }
}

/// Encodes `value` as CBOR and stores it under `key`.
pub async fn set_value<T, B>(bucket: &B, key: &str, value: &T) -> BucketResult<()>
where
    T: Serialize + ?Sized,
    B: Bucket + ?Sized,
{
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| BucketError::codec(key, e))?;
    bucket.set_item(key, bytes).await
}
