//! Favorites list rules and the storage trait.
//!
//! A favorites list is ordered most-recently-added first, unique by search
//! key and bounded. Adding a city that is already present moves it to the
//! front instead of appending a duplicate; adding past capacity drops the
//! least-recently-added entry.

use async_trait::async_trait;
use tokio::sync::watch;

use skycast_core::DatabaseError;
use skycast_weather::City;

/// Number of favorites kept when no capacity is configured.
pub const DEFAULT_FAVORITES_CAPACITY: usize = 10;

/// Result type for favorites store operations.
pub type FavoritesResult<T> = Result<T, DatabaseError>;

/// Persistent favorites storage.
///
/// Implementations own their own atomicity: every write is a
/// read-modify-write of the whole list and must not interleave with another
/// write on the same store. Callers never hold a lock across these calls.
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Insert `city` at the front, replacing any entry with the same key.
    async fn add(&self, city: &City) -> FavoritesResult<()>;

    /// Remove the entry for `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> FavoritesResult<()>;

    async fn is_favorite(&self, key: &str) -> FavoritesResult<bool>;

    /// Stream of the current list; a fresh receiver yields the latest snapshot.
    fn list(&self) -> watch::Receiver<Vec<City>>;

    /// Stream of the pinned city name (the last city saved as "home").
    fn pinned_city_name(&self) -> watch::Receiver<Option<String>>;

    async fn save_pinned_city_name(&self, name: &str) -> FavoritesResult<()>;
}

/// In-memory favorites list applying the ordering and capacity rules.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoritesList {
    cities: Vec<City>,
    capacity: usize,
}

impl Default for FavoritesList {
    fn default() -> Self {
        Self::new(DEFAULT_FAVORITES_CAPACITY)
    }
}

impl FavoritesList {
    pub fn new(capacity: usize) -> Self {
        Self {
            cities: Vec::new(),
            capacity,
        }
    }

    /// Build a list from stored cities, dropping later duplicates and
    /// anything beyond capacity.
    pub fn from_cities(cities: impl IntoIterator<Item = City>, capacity: usize) -> Self {
        let mut list = Self::new(capacity);
        for city in cities {
            if list.cities.len() >= capacity {
                break;
            }
            if !list.contains(&city.search_key()) {
                list.cities.push(city);
            }
        }
        list
    }

    /// Move-to-front insert.
    pub fn add(&mut self, city: City) {
        let key = city.search_key();
        self.cities.retain(|c| c.search_key() != key);
        self.cities.insert(0, city);
        self.cities.truncate(self.capacity);
    }

    /// Returns true if an entry was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.cities.len();
        self.cities.retain(|c| c.search_key() != key);
        self.cities.len() != before
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cities.iter().any(|c| c.search_key() == key)
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn to_vec(&self) -> Vec<City> {
        self.cities.clone()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, country: &str) -> City {
        City::new(name, country, None, 0.0, 0.0)
    }

    #[test]
    fn test_add_puts_newest_first() {
        let mut list = FavoritesList::default();
        list.add(city("London", "GB"));
        list.add(city("Paris", "FR"));
        let names: Vec<_> = list.cities().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Paris", "London"]);
    }

    #[test]
    fn test_re_add_moves_to_front_without_duplicate() {
        let mut list = FavoritesList::default();
        list.add(city("London", "GB"));
        list.add(city("Paris", "FR"));
        list.add(city("Berlin", "DE"));
        list.add(city("london", "gb"));

        assert_eq!(list.len(), 3);
        assert_eq!(list.cities()[0].search_key(), "london, gb");
        assert_eq!(list.cities()[1].name, "Berlin");
    }

    #[test]
    fn test_eleventh_favorite_drops_oldest() {
        let mut list = FavoritesList::default();
        for i in 0..11 {
            list.add(city(&format!("City{}", i), "XX"));
        }

        assert_eq!(list.len(), DEFAULT_FAVORITES_CAPACITY);
        assert_eq!(list.cities()[0].name, "City10");
        assert!(!list.contains("city0, xx"));
        assert!(list.contains("city1, xx"));
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let mut list = FavoritesList::default();
        list.add(city("London", "GB"));
        assert!(!list.remove("paris, fr"));
        assert!(list.remove("london, gb"));
        assert!(!list.remove("london, gb"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_from_cities_dedupes_and_caps() {
        let list = FavoritesList::from_cities(
            vec![
                city("London", "GB"),
                city("LONDON", "GB"),
                city("Paris", "FR"),
                city("Rome", "IT"),
            ],
            2,
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list.capacity(), 2);
        assert_eq!(list.cities()[1].name, "Paris");
    }
}
