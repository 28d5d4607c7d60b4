pub mod config;
mod error;
pub mod helpers;
pub mod poll;
pub mod query;
mod routes;
pub mod scheduler;
pub mod snapshot;
mod validation;
pub mod views;

use axum::{Router, http::StatusCode, routing::get};
use mcwatch_db::ServerIdentity;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::poll::Tracker;
use crate::snapshot::StatusView;
use crate::views::ViewCache;

pub struct AppState {
    pub tracker: Tracker,
    pub views: ViewCache,
    /// One lock per tracked server so its poll cycles never overlap.
    poll_locks: HashMap<ServerIdentity, Mutex<()>>,
}

impl AppState {
    pub fn new(tracker: Tracker) -> Self {
        let poll_locks = tracker
            .servers()
            .iter()
            .map(|identity| (identity.clone(), Mutex::new(())))
            .collect();
        Self {
            tracker,
            views: ViewCache::new(),
            poll_locks,
        }
    }

    /// Run a poll cycle for `identity` and publish the resulting view.
    pub async fn refresh(&self, identity: &ServerIdentity, now: i64) -> StatusView {
        let _guard = self.lock_polls(identity).await;
        self.poll_and_publish(identity, now).await
    }

    /// The latest published view, polling once if the server has none yet.
    /// Callers that arrive while that first poll runs wait for its result.
    pub async fn latest_view(&self, identity: &ServerIdentity, now: i64) -> StatusView {
        if let Some(view) = self.views.get(identity).await {
            return view;
        }

        let _guard = self.lock_polls(identity).await;
        match self.views.get(identity).await {
            Some(view) => view,
            None => self.poll_and_publish(identity, now).await,
        }
    }

    async fn lock_polls(&self, identity: &ServerIdentity) -> Option<MutexGuard<'_, ()>> {
        match self.poll_locks.get(identity) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    async fn poll_and_publish(&self, identity: &ServerIdentity, now: i64) -> StatusView {
        let outcome = self.tracker.poll(identity, now).await;
        let view = snapshot::build(&outcome);
        self.views.store(identity, view.clone()).await;
        view
    }
}

/// Create the application router with the given state and configuration
pub fn create_app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/servers", get(routes::servers))
        .route("/status/{host}/{port}", get(routes::status))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}
