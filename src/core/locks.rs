use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// One async mutex per ship. Operations on different ships never contend.
/// A ship's entry lives only while someone holds or waits for its lock.
#[derive(Debug, Default)]
pub struct ShipLocks {
    inner: Registry,
}

/// Held lock on one ship. Dropping the last guard of a ship removes its entry.
#[derive(Debug)]
pub struct ShipGuard {
    ship_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl Drop for ShipGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // 只剩登錄表本身持有時才移除; handle() 與此處都在同一把鎖下
        let idle = map
            .get(&self.ship_id)
            .map_or(false, |m| Arc::strong_count(m) == 1);
        if idle {
            map.remove(&self.ship_id);
        }
    }
}

impl ShipLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, ship_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(ship_id.to_string()).or_default().clone()
    }

    pub async fn lock(&self, ship_id: &str) -> ShipGuard {
        let guard = self.handle(ship_id).lock_owned().await;
        ShipGuard {
            ship_id: ship_id.to_string(),
            guard: Some(guard),
            registry: self.inner.clone(),
        }
    }

    /// Locks every ship in ascending id order so that two callers with
    /// overlapping sets cannot deadlock. Duplicates are locked once.
    pub async fn lock_all<I, T>(&self, ship_ids: I) -> Vec<ShipGuard>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let ordered: BTreeSet<String> = ship_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        let mut guards = Vec::with_capacity(ordered.len());
        for ship_id in ordered {
            guards.push(self.lock(&ship_id).await);
        }
        guards
    }

    pub fn tracked_ships(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
