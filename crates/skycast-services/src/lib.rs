pub mod favorites;
pub mod favorites_store;
pub mod memory_store;

pub use favorites::{FavoritesList, FavoritesResult, FavoritesStore, DEFAULT_FAVORITES_CAPACITY};
pub use favorites_store::SqliteFavoritesStore;
pub use memory_store::MemoryFavoritesStore;
