//! Quorum server - weighted-vote treasury governance and bounty tracking

pub mod error;
pub mod governance;
pub mod store;
pub mod websocket;

use std::sync::Arc;

use governance::GovernanceEngine;
use store::Store;

/// Application state shared across handlers
pub struct AppState {
    pub engine: GovernanceEngine,
    pub store: Store,
}

impl AppState {
    pub fn new(engine: GovernanceEngine, store: Store) -> Arc<Self> {
        Arc::new(Self { engine, store })
    }
}
