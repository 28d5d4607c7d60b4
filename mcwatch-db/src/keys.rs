//! Cache key derivation.
//!
//! Keys have the shape `{prefix}minecraft_data_{sha256(host_port)}`. The hash
//! suffix has a fixed length, so two different prefixes can never produce the
//! same key for one server.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::models::ServerIdentity;

/// Category prefix for the cached [`ServerSnapshot`](crate::ServerSnapshot).
pub const SERVER_DATA_PREFIX: &str = "server_data_";

/// Category prefix for the cached [`PresenceTable`](crate::PresenceTable).
pub const PLAYER_DATA_PREFIX: &str = "player_data_";

/// Global peak concurrency counter. Not namespaced per server.
pub const MAX_PLAYERS_KEY: &str = "minecraft_max_players_ever_seen";

/// Opaque key into a [`CacheStore`](crate::CacheStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn server_data(identity: &ServerIdentity) -> Self {
    derive(SERVER_DATA_PREFIX, &identity.hostname, identity.port)
  }

  pub fn player_data(identity: &ServerIdentity) -> Self {
    derive(PLAYER_DATA_PREFIX, &identity.hostname, identity.port)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl AsRef<str> for CacheKey {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Strip trailing slashes, then a leading `http://` or `https://`.
pub fn normalize_hostname(hostname: &str) -> &str {
  let trimmed = hostname.trim_end_matches('/');
  trimmed
    .strip_prefix("https://")
    .or_else(|| trimmed.strip_prefix("http://"))
    .unwrap_or(trimmed)
}

/// Derive the cache key for a data category on a server.
pub fn derive(prefix: &str, hostname: &str, port: u16) -> CacheKey {
  let identity = format!("{}_{}", normalize_hostname(hostname), port);
  let digest = Sha256::digest(identity.as_bytes());
  CacheKey(format!("{prefix}minecraft_data_{digest:x}"))
}
