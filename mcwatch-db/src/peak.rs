//! Peak concurrent player counter.
//!
//! The counter lives under one global key shared by every tracked server.
//! Updates are an unguarded read-modify-write: two polls finishing at the
//! same time can lose the larger value. Both are known limitations.

use tracing::debug;

use crate::error::Result;
use crate::keys::MAX_PLAYERS_KEY;
use crate::store::{CacheStore, CacheStoreExt};

/// Read the stored peak, or 0 if none has been recorded.
pub async fn max_players_ever_seen<S: CacheStore + ?Sized>(store: &S) -> Result<u32> {
  Ok(store.get_json(MAX_PLAYERS_KEY).await?.unwrap_or(0))
}

/// Fold the current online count into the stored peak and return the new peak.
///
/// The value is written back on every call, even when unchanged.
pub async fn observe_peak<S: CacheStore + ?Sized>(store: &S, current: u32) -> Result<u32> {
  let stored = max_players_ever_seen(store).await?;
  let peak = current.max(stored);
  store.set_json(MAX_PLAYERS_KEY, &peak).await?;

  if peak > stored {
    debug!(peak, previous = stored, "new peak player count");
  }
  Ok(peak)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  #[tokio::test]
  async fn test_peak_never_decreases() {
    let store = MemoryStore::new();
    for count in [3, 1, 5, 2] {
      observe_peak(&store, count).await.unwrap();
    }
    assert_eq!(max_players_ever_seen(&store).await.unwrap(), 5);
  }

  #[tokio::test]
  async fn test_peak_defaults_to_zero() {
    let store = MemoryStore::new();
    assert_eq!(max_players_ever_seen(&store).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_observe_writes_even_when_unchanged() {
    let store = MemoryStore::new();
    assert_eq!(observe_peak(&store, 0).await.unwrap(), 0);
    assert_eq!(store.get(MAX_PLAYERS_KEY).await.unwrap().as_deref(), Some("0"));
  }
}
