mod error;
mod keys;
mod models;
mod peak;
mod presence;
mod store;

pub use error::{DbError, Result};
pub use keys::{
  CacheKey, MAX_PLAYERS_KEY, PLAYER_DATA_PREFIX, SERVER_DATA_PREFIX, derive, normalize_hostname,
};
pub use models::{
  DEFAULT_PORT, NOT_AVAILABLE, OnlinePlayer, PlayerRecord, PresenceTable, ServerIdentity,
  ServerSnapshot,
};
pub use peak::{max_players_ever_seen, observe_peak};
pub use presence::{PrunePolicy, load_presence, prune, reconcile, update_presence};
pub use store::{CacheStore, CacheStoreExt, MemoryStore};

use async_trait::async_trait;
use std::path::Path;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

/// SQLite-backed [`CacheStore`].
#[derive(Clone)]
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create a database at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path).await.map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Create an in-memory database (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Initialize the database schema.
  async fn initialize(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(
          r#"
          -- Opaque cached values (snapshots, presence tables, counters)
          CREATE TABLE IF NOT EXISTS cache_entries (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL,
              updated_at INTEGER NOT NULL
          );
          "#,
        )?;
        Ok(())
      })
      .await?;

    info!("database initialized");
    Ok(())
  }
}

#[async_trait]
impl CacheStore for Database {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_string();
    let value = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached("SELECT value FROM cache_entries WHERE key = ?1")?
          .query_row(params![&key], |row| row.get(0))
          .optional()
      })
      .await?;

    Ok(value)
  }

  async fn set(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_string();
    let key_log = key.clone();

    self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
          )?
          .execute(params![&key, &value])?;
        Ok(())
      })
      .await?;

    debug!(key = %key_log, "stored cache entry");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> i64 {
    1700000000 // Fixed timestamp for testing
  }

  #[tokio::test]
  async fn test_get_missing_key_is_none() {
    let db = Database::open_in_memory().await.unwrap();
    assert!(db.get("nothing-here").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_set_then_get_returns_identical_value() {
    let db = Database::open_in_memory().await.unwrap();

    db.set("key", "value with 'quotes' and ünïcode".to_string())
      .await
      .unwrap();
    assert_eq!(
      db.get("key").await.unwrap().as_deref(),
      Some("value with 'quotes' and ünïcode")
    );
  }

  #[tokio::test]
  async fn test_set_overwrites() {
    let db = Database::open_in_memory().await.unwrap();

    db.set("key", "first".to_string()).await.unwrap();
    db.set("key", "second".to_string()).await.unwrap();

    assert_eq!(db.get("key").await.unwrap().as_deref(), Some("second"));
  }

  #[tokio::test]
  async fn test_snapshot_round_trip_through_sqlite() {
    let db = Database::open_in_memory().await.unwrap();
    let identity = ServerIdentity::new("mc.example.com", 25565);
    let key = CacheKey::server_data(&identity);
    let snapshot = ServerSnapshot {
      is_online: true,
      motd: "Welcome".to_string(),
      server_version: "Paper 1.21.4".to_string(),
      players_max: 50,
      players_online: 7,
      timestamp: Some(now()),
    };

    db.set_json(key.as_str(), &snapshot).await.unwrap();
    let loaded: ServerSnapshot = db.get_json(key.as_str()).await.unwrap().unwrap();
    assert_eq!(loaded, snapshot);
  }

  #[tokio::test]
  async fn test_presence_and_peak_on_sqlite() {
    let db = Database::open_in_memory().await.unwrap();
    let identity = ServerIdentity::new("mc.example.com", 25565);

    update_presence(
      &db,
      &identity,
      &[OnlinePlayer::new("a", "Steve"), OnlinePlayer::new("b", "Alex")],
      now(),
      &PrunePolicy::default(),
    )
    .await
    .unwrap();
    observe_peak(&db, 2).await.unwrap();
    observe_peak(&db, 1).await.unwrap();

    let table = load_presence(&db, &identity).await.unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(max_players_ever_seen(&db).await.unwrap(), 2);
  }
}
