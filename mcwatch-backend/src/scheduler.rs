//! Fixed-interval poll scheduling.
//!
//! Registrations are built at startup and each becomes one tokio task. The
//! poll cycle itself does not depend on this module and can be driven
//! directly through [`AppState::refresh`].

use mcwatch_db::ServerIdentity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::helpers::now;

/// Used in place of a zero interval, which `tokio::time::interval` rejects.
const FALLBACK_INTERVAL: Duration = Duration::from_secs(1);

/// A recurring poll of one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub identity: ServerIdentity,
    pub interval: Duration,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    registrations: Vec<Registration>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// One registration per server, all at the same interval.
    pub fn for_servers(servers: &[ServerIdentity], interval: Duration) -> Self {
        let mut scheduler = Self::new();
        for identity in servers {
            scheduler.register(identity.clone(), interval);
        }
        scheduler
    }

    pub fn register(&mut self, identity: ServerIdentity, interval: Duration) {
        let interval = if interval.is_zero() {
            warn!(server = %identity, "zero poll interval, using {:?}", FALLBACK_INTERVAL);
            FALLBACK_INTERVAL
        } else {
            interval
        };
        self.registrations.push(Registration { identity, interval });
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Start one task per registration. Tasks poll immediately, then on every
    /// interval tick, until `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn(
        self,
        state: Arc<AppState>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        self.registrations
            .into_iter()
            .map(|registration| {
                tokio::spawn(run(registration, state.clone(), shutdown.clone()))
            })
            .collect()
    }
}

async fn run(registration: Registration, state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
    let Registration { identity, interval } = registration;
    info!(server = %identity, interval_secs = interval.as_secs(), "scheduled polling");

    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let view = state.refresh(&identity, now()).await;
                debug!(
                    server = %identity,
                    online = view.server.is_online,
                    players = view.online_count,
                    "poll complete"
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!(server = %identity, "polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::Tracker;
    use crate::query::{QueryError, QueryResponse, ServerQuery};
    use async_trait::async_trait;
    use mcwatch_db::MemoryStore;

    struct AlwaysOnline;

    #[async_trait]
    impl ServerQuery for AlwaysOnline {
        async fn query(&self, _identity: &ServerIdentity) -> Result<QueryResponse, QueryError> {
            Ok(QueryResponse {
                is_online: true,
                ..QueryResponse::default()
            })
        }
    }

    #[test]
    fn test_for_servers_registers_each_server() {
        let servers = vec![
            ServerIdentity::new("a.example.com", 25565),
            ServerIdentity::new("b.example.com", 25566),
        ];
        let scheduler = Scheduler::for_servers(&servers, Duration::from_secs(60));

        assert_eq!(scheduler.registrations().len(), 2);
        assert_eq!(scheduler.registrations()[1].identity, servers[1]);
        assert_eq!(scheduler.registrations()[1].interval, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_is_replaced() {
        let mut scheduler = Scheduler::new();
        scheduler.register(ServerIdentity::new("mc.example.com", 25565), Duration::ZERO);
        scheduler.register(ServerIdentity::new("mc.example.com", 25566), Duration::from_millis(20));

        assert_eq!(scheduler.registrations()[0].interval, Duration::from_secs(1));
        assert_eq!(scheduler.registrations()[1].interval, Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_spawned_tasks_poll_and_stop() {
        let identity = ServerIdentity::new("mc.example.com", 25565);
        let tracker = Tracker::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AlwaysOnline),
            vec![identity.clone()],
        );
        let state = Arc::new(AppState::new(tracker));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = Scheduler::for_servers(&[identity.clone()], Duration::from_millis(20))
            .spawn(state.clone(), shutdown_rx);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let view = state.views.get(&identity).await.unwrap();
        assert!(view.server.is_online);

        shutdown_tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
