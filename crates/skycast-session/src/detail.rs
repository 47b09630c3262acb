//! Full weather for one city: manual search by name or a selected card.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::state::StateStore;
use skycast_core::ValidationError;
use skycast_services::FavoritesStore;
use skycast_weather::{City, Resource, WeatherClient, WeatherReport};

#[derive(Debug, Clone, PartialEq)]
enum DetailRequest {
    ByName(String),
    ByCity(City),
}

pub struct DetailController {
    state: Arc<StateStore>,
    weather: Arc<dyn WeatherClient>,
    favorites: Arc<dyn FavoritesStore>,
    last_request: Mutex<Option<DetailRequest>>,
}

impl DetailController {
    pub fn new(
        state: Arc<StateStore>,
        weather: Arc<dyn WeatherClient>,
        favorites: Arc<dyn FavoritesStore>,
    ) -> Self {
        Self {
            state,
            weather,
            favorites,
            last_request: Mutex::new(None),
        }
    }

    /// Fetch weather for the current query text.
    pub async fn search_weather(&self) {
        let name = self.state.snapshot().query.trim().to_string();
        if name.is_empty() {
            let message = ValidationError::BlankCityName.to_string();
            self.state.apply(|s| {
                s.detail_error = Some(message);
                s.detail_loading = false;
                Some(())
            });
            return;
        }

        self.load(DetailRequest::ByName(name)).await;
    }

    /// Replace the candidate cards with the detail view for `city`.
    pub async fn select_city(&self, city: City) {
        let selected = city.clone();
        self.state.apply(|s| {
            s.query = selected.name.clone();
            s.search_generation += 1;
            s.cards.clear();
            s.show_cards = false;
            s.search_in_flight = false;
            s.selected_city = Some(selected);
            Some(())
        });

        self.load(DetailRequest::ByCity(city)).await;
    }

    /// Re-run the last detail request. Does nothing if there was none.
    pub async fn retry(&self) {
        let last = self.last_request.lock().clone();
        match last {
            Some(request) => self.load(request).await,
            None => tracing::debug!("Nothing to retry"),
        }
    }

    pub fn clear_error(&self) {
        self.state.apply(|s| {
            s.detail_error.take()?;
            Some(())
        });
    }

    async fn load(&self, request: DetailRequest) {
        *self.last_request.lock() = Some(request.clone());

        let Some(generation) = self.state.apply(|s| {
            s.detail_generation += 1;
            s.detail_loading = true;
            s.detail_error = None;
            Some(s.detail_generation)
        }) else {
            return;
        };

        let result = match &request {
            DetailRequest::ByName(name) => self.weather.by_name(name).await,
            DetailRequest::ByCity(city) => {
                self.weather
                    .by_coordinates(city.latitude, city.longitude)
                    .await
            }
        };

        match Resource::from(result) {
            Resource::Success(report) => self.show_report(generation, report).await,
            Resource::Error(message) => {
                tracing::debug!("Detail request {:?} failed: {}", request, message);
                self.state.apply(|s| {
                    if s.detail_generation != generation {
                        return None;
                    }
                    s.detail_loading = false;
                    s.detail_error = Some(message);
                    Some(())
                });
            }
            Resource::Loading => {}
        }
    }

    async fn show_report(&self, generation: u64, report: WeatherReport) {
        let key = report.search_key();
        let shown = self.state.apply(|s| {
            if s.detail_generation != generation {
                return None;
            }
            s.detail_weather = Some(report);
            s.detail_loading = false;
            s.detail_error = None;
            s.detail_is_favorite = false;
            s.show_cards = false;
            Some(())
        });
        if shown.is_none() {
            tracing::debug!("Discarded stale detail result for {}", key);
            return;
        }

        let is_favorite = self.favorites.is_favorite(&key).await.unwrap_or_else(|e| {
            tracing::warn!("Favorite lookup for {} failed: {}", key, e);
            false
        });

        self.state.apply(|s| {
            if s.detail_generation != generation || s.detail_is_favorite == is_favorite {
                return None;
            }
            s.detail_is_favorite = is_favorite;
            Some(())
        });
    }
}
