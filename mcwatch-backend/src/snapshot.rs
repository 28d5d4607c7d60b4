//! Display-ready view of a poll outcome.

use mcwatch_db::{OnlinePlayer, PlayerRecord, PresenceTable, ServerSnapshot};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashSet;

use crate::helpers::human_time_diff;
use crate::poll::PollOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub hostname: String,
    pub port: u16,
    pub server: ServerSnapshot,
    /// Players in the live response (0 when unreachable)
    pub online_count: usize,
    pub max_players_ever_seen: u32,
    /// Online players first, then offline players by most recent sighting
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub online: bool,
    pub last_seen: Option<i64>,
    /// "5 mins" style distance to `now`, filled for offline players on request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_ago: Option<String>,
}

impl StatusView {
    /// Fill `last_seen_ago` for offline players relative to `now`.
    pub fn with_relative_times(mut self, now: i64) -> Self {
        for player in self.players.iter_mut().filter(|p| !p.online) {
            player.last_seen_ago = player.last_seen.map(|seen| human_time_diff(seen, now));
        }
        self
    }
}

pub fn build(outcome: &PollOutcome) -> StatusView {
    StatusView {
        hostname: outcome.identity.host().to_string(),
        port: outcome.identity.port,
        server: outcome.snapshot.clone(),
        online_count: outcome.online_players.len(),
        max_players_ever_seen: outcome.max_players_ever_seen,
        players: order_players(&outcome.presence, &outcome.online_players),
    }
}

/// Online players in the order the server listed them, followed by every
/// other known player sorted by `last_seen` descending. Ties keep table order.
pub fn order_players(table: &PresenceTable, online: &[OnlinePlayer]) -> Vec<PlayerView> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(online.len());
    let mut players: Vec<PlayerView> = online
        .iter()
        .filter(|p| seen.insert(p.id.as_str()))
        .filter_map(|p| table.get(&p.id))
        .map(|record| view(record, true))
        .collect();

    let mut offline: Vec<&PlayerRecord> = table
        .iter()
        .filter(|r| !seen.contains(r.id.as_str()))
        .collect();
    // sort_by_key is stable
    offline.sort_by_key(|r| Reverse(r.last_seen));

    players.extend(offline.into_iter().map(|record| view(record, false)));
    players
}

fn view(record: &PlayerRecord, online: bool) -> PlayerView {
    PlayerView {
        id: record.id.clone(),
        name: record.name.clone(),
        online,
        last_seen: record.last_seen,
        last_seen_ago: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcwatch_db::ServerIdentity;

    fn record(id: &str, last_seen: i64) -> PlayerRecord {
        PlayerRecord {
            id: id.to_string(),
            name: id.to_string(),
            last_seen: Some(last_seen),
        }
    }

    fn ids(players: &[PlayerView]) -> Vec<&str> {
        players.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_online_then_offline_by_recency() {
        let table: PresenceTable = [record("B", 100), record("C", 200), record("A", 300)]
            .into_iter()
            .collect();

        let players = order_players(&table, &[OnlinePlayer::new("A", "A")]);

        assert_eq!(ids(&players), vec!["A", "C", "B"]);
        assert!(players[0].online);
        assert!(!players[1].online);
        assert!(!players[2].online);
    }

    #[test]
    fn test_ties_keep_table_order() {
        let table: PresenceTable = [record("x", 100), record("y", 100), record("z", 100)]
            .into_iter()
            .collect();

        let players = order_players(&table, &[]);
        assert_eq!(ids(&players), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_online_order_follows_live_list() {
        let table: PresenceTable = [record("a", 1), record("b", 1)].into_iter().collect();
        let online = [OnlinePlayer::new("b", "b"), OnlinePlayer::new("a", "a")];

        let players = order_players(&table, &online);
        assert_eq!(ids(&players), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_last_seen_sorts_last() {
        let mut table: PresenceTable = [record("a", 100)].into_iter().collect();
        table.push(PlayerRecord {
            id: "ghost".to_string(),
            name: "ghost".to_string(),
            last_seen: None,
        });
        table.push(record("b", 200));

        let players = order_players(&table, &[]);
        assert_eq!(ids(&players), vec!["b", "a", "ghost"]);
    }

    #[test]
    fn test_build_and_relative_times() {
        let outcome = PollOutcome {
            identity: ServerIdentity::new("https://mc.example.com/", 25565),
            snapshot: ServerSnapshot::default(),
            online_players: vec![OnlinePlayer::new("a", "a")],
            presence: [record("a", 1000), record("b", 1000 - 300)].into_iter().collect(),
            max_players_ever_seen: 4,
        };

        let view = build(&outcome).with_relative_times(1000);

        assert_eq!(view.hostname, "mc.example.com");
        assert_eq!(view.online_count, 1);
        assert_eq!(view.max_players_ever_seen, 4);
        assert_eq!(view.players[0].last_seen_ago, None);
        assert_eq!(view.players[1].last_seen_ago.as_deref(), Some("5 mins"));
    }
}
