//! Non-persistent favorites store.
//!
//! Backs the session tests and any run without a writable config directory.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::favorites::{FavoritesList, FavoritesResult, FavoritesStore};
use skycast_weather::City;

pub struct MemoryFavoritesStore {
    list: Mutex<FavoritesList>,
    // Sent while `list` is locked so the stream sees writes in order.
    list_tx: watch::Sender<Vec<City>>,
    pinned_tx: watch::Sender<Option<String>>,
}

impl MemoryFavoritesStore {
    pub fn new(capacity: usize) -> Self {
        let (list_tx, _) = watch::channel(Vec::new());
        let (pinned_tx, _) = watch::channel(None);
        Self {
            list: Mutex::new(FavoritesList::new(capacity)),
            list_tx,
            pinned_tx,
        }
    }

    /// Seed the store with existing favorites, most recent first.
    pub fn with_cities(capacity: usize, cities: Vec<City>) -> Self {
        let store = Self::new(capacity);
        let list = FavoritesList::from_cities(cities, capacity);
        store.list_tx.send_replace(list.to_vec());
        *store.list.lock() = list;
        store
    }

    pub fn snapshot(&self) -> Vec<City> {
        self.list.lock().to_vec()
    }
}

impl Default for MemoryFavoritesStore {
    fn default() -> Self {
        Self::new(crate::favorites::DEFAULT_FAVORITES_CAPACITY)
    }
}

#[async_trait]
impl FavoritesStore for MemoryFavoritesStore {
    async fn add(&self, city: &City) -> FavoritesResult<()> {
        let mut list = self.list.lock();
        list.add(city.clone());
        self.list_tx.send_replace(list.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> FavoritesResult<()> {
        let mut list = self.list.lock();
        if list.remove(key) {
            self.list_tx.send_replace(list.to_vec());
        }
        Ok(())
    }

    async fn is_favorite(&self, key: &str) -> FavoritesResult<bool> {
        Ok(self.list.lock().contains(key))
    }

    fn list(&self) -> watch::Receiver<Vec<City>> {
        self.list_tx.subscribe()
    }

    fn pinned_city_name(&self) -> watch::Receiver<Option<String>> {
        self.pinned_tx.subscribe()
    }

    async fn save_pinned_city_name(&self, name: &str) -> FavoritesResult<()> {
        self.pinned_tx.send_replace(Some(name.to_string()));
        Ok(())
    }
}
