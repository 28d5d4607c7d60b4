use mcwatch_db::ServerIdentity;
use scc::HashMap;

use crate::snapshot::StatusView;

/// In-memory cache of the latest view per tracked server.
///
/// Rebuilt from the store on the first poll after a restart, so durability
/// isn't needed.
pub struct ViewCache {
    views: HashMap<ServerIdentity, StatusView>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self {
            views: HashMap::new(),
        }
    }

    /// Replace the stored view for a server.
    pub async fn store(&self, identity: &ServerIdentity, view: StatusView) {
        self.views
            .entry_async(identity.clone())
            .await
            .insert_entry(view);
    }

    /// Get a copy of the latest view for a server.
    pub async fn get(&self, identity: &ServerIdentity) -> Option<StatusView> {
        self.views.read_async(identity, |_, view| view.clone()).await
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}
