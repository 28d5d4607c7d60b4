//! Per-player "last seen" bookkeeping.

use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::keys::CacheKey;
use crate::models::{OnlinePlayer, PlayerRecord, PresenceTable, ServerIdentity};
use crate::store::{CacheStore, CacheStoreExt};

/// Optional bound on presence table growth.
///
/// The default keeps every player ever seen. Pruning only ever removes
/// players that are currently offline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrunePolicy {
  /// Drop offline players not seen for this many seconds
  pub max_age: Option<i64>,
  /// Keep at most this many records, dropping the least recently seen
  pub max_entries: Option<usize>,
}

impl PrunePolicy {
  pub fn is_unbounded(&self) -> bool {
    self.max_age.is_none() && self.max_entries.is_none()
  }
}

/// Merge a live player list into a presence table.
///
/// Online players are upserted with `last_seen = now`. Offline players keep
/// their last sighting, except records with no `last_seen` or one already
/// equal to `now`, which are stamped with `now`.
pub fn reconcile(online: &[OnlinePlayer], table: &mut PresenceTable, now: i64) {
  for player in online {
    match table.get_mut(&player.id) {
      Some(record) => {
        record.name = player.name.clone();
        record.last_seen = Some(now);
      }
      None => table.push(PlayerRecord {
        id: player.id.clone(),
        name: player.name.clone(),
        last_seen: Some(now),
      }),
    }
  }

  let online_ids: HashSet<&str> = online.iter().map(|p| p.id.as_str()).collect();
  for record in table.iter_mut() {
    if online_ids.contains(record.id.as_str()) {
      continue;
    }
    if record.last_seen.is_none_or(|seen| seen == now) {
      record.last_seen = Some(now);
    }
  }
}

/// Remove offline records according to `policy`. Returns how many were dropped.
pub fn prune(
  table: &mut PresenceTable,
  online: &[OnlinePlayer],
  now: i64,
  policy: &PrunePolicy,
) -> usize {
  let before = table.len();
  let online_ids: HashSet<&str> = online.iter().map(|p| p.id.as_str()).collect();

  if let Some(max_age) = policy.max_age {
    let cutoff = now.saturating_sub(max_age);
    table.retain(|r| {
      online_ids.contains(r.id.as_str()) || r.last_seen.is_some_and(|seen| seen >= cutoff)
    });
  }

  if let Some(max_entries) = policy.max_entries {
    if table.len() > max_entries {
      let mut offline: Vec<(Option<i64>, String)> = table
        .iter()
        .filter(|r| !online_ids.contains(r.id.as_str()))
        .map(|r| (r.last_seen, r.id.clone()))
        .collect();
      // oldest first; stable so earlier-inserted records go first on ties
      offline.sort_by_key(|(seen, _)| *seen);

      let excess = table.len() - max_entries;
      let evicted: HashSet<String> = offline.into_iter().take(excess).map(|(_, id)| id).collect();
      table.retain(|r| !evicted.contains(&r.id));
    }
  }

  before - table.len()
}

/// Load a server's presence table, or an empty one if none is stored.
pub async fn load_presence<S: CacheStore + ?Sized>(
  store: &S,
  identity: &ServerIdentity,
) -> Result<PresenceTable> {
  let key = CacheKey::player_data(identity);
  Ok(store.get_json(key.as_str()).await?.unwrap_or_default())
}

/// Reconcile a live player list against the stored table and persist it.
pub async fn update_presence<S: CacheStore + ?Sized>(
  store: &S,
  identity: &ServerIdentity,
  online: &[OnlinePlayer],
  now: i64,
  policy: &PrunePolicy,
) -> Result<PresenceTable> {
  let key = CacheKey::player_data(identity);
  let mut table: PresenceTable = store.get_json(key.as_str()).await?.unwrap_or_default();

  reconcile(online, &mut table, now);
  let pruned = prune(&mut table, online, now, policy);

  store.set_json(key.as_str(), &table).await?;
  debug!(
    server = %identity,
    online = online.len(),
    known = table.len(),
    pruned,
    "updated presence"
  );
  Ok(table)
}
