use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keys::normalize_hostname;

/// Default Minecraft Java Edition port.
pub const DEFAULT_PORT: u16 = 25565;

/// Placeholder for string fields the server did not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// A tracked Minecraft server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerIdentity {
  /// Hostname as configured; may still carry a scheme or trailing slash
  pub hostname: String,
  pub port: u16,
}

impl ServerIdentity {
  pub fn new(hostname: impl Into<String>, port: u16) -> Self {
    Self {
      hostname: hostname.into(),
      port,
    }
  }

  /// Hostname with any `http://`/`https://` prefix and trailing `/` removed.
  pub fn host(&self) -> &str {
    normalize_hostname(&self.hostname)
  }
}

impl fmt::Display for ServerIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.host(), self.port)
  }
}

/// Last known state of a server.
///
/// Replaced on every successful poll; served unchanged when the server
/// cannot be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
  pub is_online: bool,
  pub motd: String,
  pub server_version: String,
  pub players_max: u32,
  pub players_online: u32,
  /// Unix timestamp of the poll that produced this snapshot.
  /// `None` for the zero-value default.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<i64>,
}

impl Default for ServerSnapshot {
  fn default() -> Self {
    Self {
      is_online: false,
      motd: NOT_AVAILABLE.to_string(),
      server_version: NOT_AVAILABLE.to_string(),
      players_max: 0,
      players_online: 0,
      timestamp: None,
    }
  }
}

/// A player reported online by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlinePlayer {
  /// Player UUID as reported in the status sample
  pub id: String,
  pub name: String,
}

impl OnlinePlayer {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
    }
  }
}

/// Presence bookkeeping for one player ever seen on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
  pub id: String,
  pub name: String,
  /// Unix timestamp of the last poll that saw this player online
  #[serde(default)]
  pub last_seen: Option<i64>,
}

/// Every player ever observed on one server, in first-seen order.
///
/// Backed by a Vec: lookups are linear, which is fine at the sizes a single
/// server produces and keeps iteration order stable for tie-breaking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresenceTable {
  players: Vec<PlayerRecord>,
}

impl PresenceTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, id: &str) -> Option<&PlayerRecord> {
    self.players.iter().find(|p| p.id == id)
  }

  pub fn get_mut(&mut self, id: &str) -> Option<&mut PlayerRecord> {
    self.players.iter_mut().find(|p| p.id == id)
  }

  /// Append a record. Callers check for an existing id first.
  pub fn push(&mut self, record: PlayerRecord) {
    self.players.push(record);
  }

  pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
    self.players.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerRecord> {
    self.players.iter_mut()
  }

  pub fn retain(&mut self, f: impl FnMut(&PlayerRecord) -> bool) {
    self.players.retain(f);
  }

  pub fn len(&self) -> usize {
    self.players.len()
  }

  pub fn is_empty(&self) -> bool {
    self.players.is_empty()
  }
}

impl FromIterator<PlayerRecord> for PresenceTable {
  fn from_iter<I: IntoIterator<Item = PlayerRecord>>(iter: I) -> Self {
    Self {
      players: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_snapshot_is_zero_value() {
    let snapshot = ServerSnapshot::default();
    assert!(!snapshot.is_online);
    assert_eq!(snapshot.motd, "N/A");
    assert_eq!(snapshot.server_version, "N/A");
    assert_eq!(snapshot.players_max, 0);
    assert_eq!(snapshot.players_online, 0);
    assert_eq!(snapshot.timestamp, None);
  }

  #[test]
  fn test_snapshot_json_field_names() {
    let snapshot = ServerSnapshot {
      is_online: true,
      motd: "A Minecraft Server".to_string(),
      server_version: "1.21.4".to_string(),
      players_max: 20,
      players_online: 3,
      timestamp: Some(1700000000),
    };
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["isOnline"], true);
    assert_eq!(json["serverVersion"], "1.21.4");
    assert_eq!(json["playersMax"], 20);
    assert_eq!(json["timestamp"], 1700000000);
  }

  #[test]
  fn test_presence_table_missing_last_seen_decodes_as_none() {
    let table: PresenceTable =
      serde_json::from_str(r#"[{"id":"abc","name":"Steve"}]"#).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("abc").unwrap().last_seen, None);
  }

  #[test]
  fn test_identity_display_uses_normalized_host() {
    let identity = ServerIdentity::new("https://mc.example.com/", 25565);
    assert_eq!(identity.host(), "mc.example.com");
    assert_eq!(identity.to_string(), "mc.example.com:25565");
  }
}
