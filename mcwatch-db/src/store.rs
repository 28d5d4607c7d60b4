//! Key-value persistence behind the poll cycle.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::Result;

/// Durable string key-value storage.
///
/// An absent key is `Ok(None)`, not an error. Writes are last-write-wins;
/// there is no locking or transactional read-modify-write.
#[async_trait]
pub trait CacheStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>>;

  async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// JSON helpers on top of any [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
  /// Read and decode a value. A value that no longer decodes is treated as
  /// absent so callers fall back to their default.
  async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
    let Some(raw) = self.get(key).await? else {
      return Ok(None);
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(err) => {
        warn!(key, %err, "discarding undecodable cache entry");
        Ok(None)
      }
    }
  }

  async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    self.set(key, raw).await
  }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}

/// In-memory store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
  entries: scc::HashMap<String, String>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CacheStore for MemoryStore {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries.read_async(key, |_, v| v.clone()).await)
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    self
      .entries
      .entry_async(key.to_string())
      .await
      .insert_entry(value);
    Ok(())
  }
}
