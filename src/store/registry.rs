use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{EntryRepository, EntryStore};

/// Owns one `EntryStore` per authenticated user. Stores are created empty
/// on first use and evicted on sign-out, and the per-store mutex serializes
/// save/delete calls for a user so overlapping writes to the same date
/// cannot race within this process.
#[derive(Clone)]
pub struct StoreRegistry {
    repo: Arc<dyn EntryRepository>,
    stores: Arc<RwLock<HashMap<Uuid, Arc<Mutex<EntryStore>>>>>,
}

impl StoreRegistry {
    pub fn new(repo: Arc<dyn EntryRepository>) -> Self {
        Self {
            repo,
            stores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn store_for(&self, user_id: Uuid) -> Arc<Mutex<EntryStore>> {
        if let Some(store) = self.stores.read().await.get(&user_id) {
            return store.clone();
        }

        let mut stores = self.stores.write().await;
        stores
            .entry(user_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(EntryStore::new(Some(user_id), self.repo.clone())))
            })
            .clone()
    }

    /// Drop the user's store and cache; called on sign-out.
    pub async fn evict(&self, user_id: Uuid) {
        self.stores.write().await.remove(&user_id);
    }
}
