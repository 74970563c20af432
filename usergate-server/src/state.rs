//! Application state

use std::sync::Arc;
use std::time::Instant;
use usergate_core::{BearerGate, InMemoryUserStore, RouteTable, UserStore, UsergateConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Backing store for the user handlers
    pub store: Arc<dyn UserStore>,

    /// Bearer token check for the protected prefix
    pub gate: Arc<BearerGate>,

    /// Route bindings the router is built from
    pub routes: Arc<RouteTable>,

    /// Server start time
    pub start_time: Instant,

    /// Debug mode flag
    pub debug: bool,
}

impl AppState {
    /// Create application state
    pub fn new(store: Arc<dyn UserStore>, gate: BearerGate, routes: RouteTable) -> Self {
        Self {
            store,
            gate: Arc::new(gate),
            routes: Arc::new(routes),
            start_time: Instant::now(),
            debug: false,
        }
    }

    /// State for a validated configuration, backed by an in-memory store
    pub fn from_config(config: &UsergateConfig) -> usergate_core::Result<Self> {
        let mut state = Self::new(
            Arc::new(InMemoryUserStore::new()),
            config.gate()?,
            config.route_table()?,
        );
        state.debug = config.server.debug;
        Ok(state)
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
