//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::rooms::RoomRegistry;
use crate::store::RoomStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
    pub room_store: RoomStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Best-effort store; absent configuration means memory-only mode
        let room_store = RoomStore::new(&config);

        // The room registry owns all room/connection state and is the only
        // mutator of it
        let rooms = Arc::new(RoomRegistry::new(room_store.clone()));

        Self {
            config,
            rooms,
            room_store,
        }
    }
}
