//! One retrieval of a server's state.

use mcwatch_db::{
    CacheKey, CacheStore, CacheStoreExt, NOT_AVAILABLE, OnlinePlayer, PresenceTable, PrunePolicy,
    ServerIdentity, ServerSnapshot, load_presence, observe_peak, update_presence,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::query::{QueryResponse, ServerQuery};

/// Result of a poll cycle, ready for [`crate::snapshot::build`].
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub identity: ServerIdentity,
    /// Fresh snapshot when online, otherwise the last stored one (or the default)
    pub snapshot: ServerSnapshot,
    /// Players in the live response; empty when the server was unreachable
    pub online_players: Vec<OnlinePlayer>,
    pub presence: PresenceTable,
    pub max_players_ever_seen: u32,
}

/// Polls tracked servers against an injected store and query client.
pub struct Tracker {
    store: Arc<dyn CacheStore>,
    query: Arc<dyn ServerQuery>,
    servers: Vec<ServerIdentity>,
    prune: PrunePolicy,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn CacheStore>,
        query: Arc<dyn ServerQuery>,
        servers: Vec<ServerIdentity>,
    ) -> Self {
        Self {
            store,
            query,
            servers,
            prune: PrunePolicy::default(),
        }
    }

    pub fn with_prune_policy(mut self, prune: PrunePolicy) -> Self {
        self.prune = prune;
        self
    }

    pub fn servers(&self) -> &[ServerIdentity] {
        &self.servers
    }

    /// Find the tracked server matching a hostname/port, ignoring scheme and
    /// trailing slash differences.
    pub fn find_server(&self, hostname: &str, port: u16) -> Option<&ServerIdentity> {
        let wanted = mcwatch_db::derive(mcwatch_db::SERVER_DATA_PREFIX, hostname, port);
        self.servers
            .iter()
            .find(|s| CacheKey::server_data(s) == wanted)
    }

    /// Run one poll cycle. Never fails: unreachable servers and store errors
    /// degrade to the last known snapshot with presence left untouched.
    pub async fn poll(&self, identity: &ServerIdentity, now: i64) -> PollOutcome {
        let live = match self.query.query(identity).await {
            Ok(response) if response.is_online => Some(response),
            Ok(_) => {
                debug!(server = %identity, "server reported offline");
                None
            }
            Err(err) => {
                info!(server = %identity, %err, "status query failed");
                None
            }
        };

        let (snapshot, online_players, presence) = match live {
            Some(response) => self.record_online(identity, response, now).await,
            None => self.recall_offline(identity).await,
        };

        let online_count = u32::try_from(online_players.len()).unwrap_or(u32::MAX);
        let max_players_ever_seen = match observe_peak(self.store.as_ref(), online_count).await {
            Ok(peak) => peak,
            Err(err) => {
                warn!(server = %identity, %err, "failed to update peak player count");
                online_count
            }
        };

        PollOutcome {
            identity: identity.clone(),
            snapshot,
            online_players,
            presence,
            max_players_ever_seen,
        }
    }

    async fn record_online(
        &self,
        identity: &ServerIdentity,
        response: QueryResponse,
        now: i64,
    ) -> (ServerSnapshot, Vec<OnlinePlayer>, PresenceTable) {
        let snapshot = ServerSnapshot {
            is_online: true,
            motd: response.motd.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            server_version: response
                .server_version
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            players_max: response.players_max.unwrap_or(0),
            players_online: response.players_online.unwrap_or(0),
            timestamp: Some(now),
        };
        let online_players = response.players.unwrap_or_default();

        let key = CacheKey::server_data(identity);
        if let Err(err) = self.store.set_json(key.as_str(), &snapshot).await {
            warn!(server = %identity, %err, "failed to store server snapshot");
        }

        let presence = match update_presence(
            self.store.as_ref(),
            identity,
            &online_players,
            now,
            &self.prune,
        )
        .await
        {
            Ok(table) => table,
            Err(err) => {
                warn!(server = %identity, %err, "failed to update presence");
                let mut table = self.stored_presence(identity).await;
                mcwatch_db::reconcile(&online_players, &mut table, now);
                table
            }
        };

        debug!(
            server = %identity,
            online = online_players.len(),
            players_online = snapshot.players_online,
            "server online"
        );
        (snapshot, online_players, presence)
    }

    async fn recall_offline(
        &self,
        identity: &ServerIdentity,
    ) -> (ServerSnapshot, Vec<OnlinePlayer>, PresenceTable) {
        let key = CacheKey::server_data(identity);
        let snapshot = match self.store.get_json(key.as_str()).await {
            Ok(cached) => cached.unwrap_or_default(),
            Err(err) => {
                warn!(server = %identity, %err, "failed to read cached snapshot");
                ServerSnapshot::default()
            }
        };

        (snapshot, Vec::new(), self.stored_presence(identity).await)
    }

    async fn stored_presence(&self, identity: &ServerIdentity) -> PresenceTable {
        load_presence(self.store.as_ref(), identity)
            .await
            .unwrap_or_else(|err| {
                warn!(server = %identity, %err, "failed to read presence table");
                PresenceTable::default()
            })
    }
}
