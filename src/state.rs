use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

use crate::config::AppConfig;
use crate::database::Store;

/// Shared handles every request works with.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub space_locks: SpaceLocks,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            space_locks: SpaceLocks::default(),
        }
    }
}

/// One async mutex per space. Holding the guard serializes the
/// read-availability-then-write sequence for that space inside this process.
#[derive(Clone, Default)]
pub struct SpaceLocks {
    slots: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SpaceLocks {
    pub async fn lock(&self, space_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slots.entry(space_id.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_space_waits_other_space_does_not() {
        let locks = SpaceLocks::default();
        let guard = locks.lock("space-a").await;

        // A different space is independent
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock("space-b")).await;
        assert!(other.is_ok());

        // Same space blocks while the guard is held
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock("space-a")).await;
        assert!(blocked.is_err());

        drop(guard);
        let freed = tokio::time::timeout(Duration::from_millis(50), locks.lock("space-a")).await;
        assert!(freed.is_ok());
    }
}
