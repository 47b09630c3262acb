//! Favorite add/remove with card and detail flag reconciliation.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::state::StateStore;
use skycast_core::DatabaseError;
use skycast_services::FavoritesStore;
use skycast_weather::City;

/// Where the current favorite status is read from before toggling.
#[derive(Debug, Clone, Copy)]
enum StatusSource {
    Card,
    Detail,
}

pub struct FavoriteToggleController {
    state: Arc<StateStore>,
    favorites: Arc<dyn FavoritesStore>,
    // Serializes toggles so a double tap resolves as add then remove.
    serial: Mutex<()>,
}

impl FavoriteToggleController {
    pub fn new(state: Arc<StateStore>, favorites: Arc<dyn FavoritesStore>) -> Self {
        Self {
            state,
            favorites,
            serial: Mutex::new(()),
        }
    }

    /// Toggle a candidate card's city. Returns the new favorite status.
    pub async fn toggle(&self, city: &City) -> Result<bool, DatabaseError> {
        self.toggle_from(city, StatusSource::Card).await
    }

    /// Toggle the city shown in the detail view. Returns the new favorite status.
    pub async fn toggle_detail(&self, city: &City) -> Result<bool, DatabaseError> {
        self.toggle_from(city, StatusSource::Detail).await
    }

    /// Toggle whatever the detail view currently shows.
    ///
    /// The selected city is stored when it is the one on display, since the
    /// report alone carries no coordinates. Returns `Ok(None)` when no detail
    /// weather is loaded.
    pub async fn toggle_current(&self) -> Result<Option<bool>, DatabaseError> {
        let state = self.state.snapshot();
        let Some(report) = &state.detail_weather else {
            return Ok(None);
        };
        let city = state
            .selected_city
            .as_ref()
            .filter(|city| city.search_key() == report.search_key())
            .cloned()
            .unwrap_or_else(|| report.city());
        self.toggle_detail(&city).await.map(Some)
    }

    /// Remove `city` from favorites regardless of its current status.
    pub async fn remove(&self, city: &City) -> Result<(), DatabaseError> {
        let _guard = self.serial.lock().await;
        let key = city.search_key();

        match self.favorites.remove(&key).await {
            Ok(()) => {
                self.set_flags(&key, false);
                Ok(())
            }
            Err(e) => Err(self.report_failure(&key, e)),
        }
    }

    pub fn clear_favorite_error(&self) {
        self.state.apply(|s| {
            s.favorite_error.take()?;
            Some(())
        });
    }

    async fn toggle_from(&self, city: &City, source: StatusSource) -> Result<bool, DatabaseError> {
        let _guard = self.serial.lock().await;
        let key = city.search_key();

        let current = match self.known_status(&key, source) {
            Some(status) => status,
            None => match self.favorites.is_favorite(&key).await {
                Ok(status) => status,
                Err(e) => return Err(self.report_failure(&key, e)),
            },
        };

        let result = if current {
            self.favorites.remove(&key).await
        } else {
            self.favorites.add(city).await
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    "{} {} favorites",
                    if current { "Removed" } else { "Added" },
                    city.display_name()
                );
                self.set_flags(&key, !current);
                Ok(!current)
            }
            Err(e) => Err(self.report_failure(&key, e)),
        }
    }

    fn known_status(&self, key: &str, source: StatusSource) -> Option<bool> {
        let state = self.state.snapshot();
        match source {
            StatusSource::Card => state
                .card(key)
                .filter(|c| c.favorite_settled)
                .map(|c| c.is_favorite),
            StatusSource::Detail => state
                .detail_weather
                .as_ref()
                .filter(|report| report.search_key() == key)
                .map(|_| state.detail_is_favorite),
        }
    }

    /// Reflect a successful store write on every card and the detail view.
    fn set_flags(&self, key: &str, is_favorite: bool) {
        self.state.apply(|s| {
            for card in s.cards.iter_mut().filter(|c| c.key() == key) {
                card.is_favorite = is_favorite;
                card.favorite_settled = true;
            }
            let detail_matches = s
                .detail_weather
                .as_ref()
                .is_some_and(|report| report.search_key() == key);
            if detail_matches {
                s.detail_is_favorite = is_favorite;
            }
            s.favorite_error = None;
            Some(())
        });
    }

    fn report_failure(&self, key: &str, error: DatabaseError) -> DatabaseError {
        tracing::warn!("Favorite update for {} failed: {}", key, error);
        let message = error.user_message().to_string();
        self.state.apply(|s| {
            s.favorite_error = Some(message);
            Some(())
        });
        error
    }
}
