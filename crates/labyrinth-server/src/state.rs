use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::broadcast::BroadcastRouter;
use crate::config::ServerConfig;
use crate::registry::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub router: Arc<BroadcastRouter>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new(config.rooms.capacity)),
            router: Arc::new(BroadcastRouter::new()),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// RAII guard for the global WebSocket connection counter.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_guard_tracks_count() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let _a = ConnectionGuard::new(Arc::clone(&count));
            let _b = ConnectionGuard::new(Arc::clone(&count));
            assert_eq!(count.load(Ordering::Relaxed), 2);
        }
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }
}
