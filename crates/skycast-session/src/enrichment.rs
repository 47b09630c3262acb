//! Per-card weather and favorite-status enrichment.
//!
//! Each card produced by a search gets one task that looks up the favorite
//! flag and the current weather concurrently, then merges both into the card
//! with the same search key. The merge only happens if the search generation
//! the task was spawned under is still current.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::StateStore;
use skycast_services::FavoritesStore;
use skycast_weather::{City, Resource, WeatherClient, WeatherReport};

/// What happened to an enrichment result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// The candidate set was superseded before the fetch completed.
    StaleGeneration,
    /// The card is no longer in the current set.
    CardGone,
    /// The fetch was aborted because a newer generation started.
    Cancelled,
}

struct GenerationToken {
    generation: u64,
    token: CancellationToken,
}

pub struct EnrichmentCoordinator {
    state: Arc<StateStore>,
    weather: Arc<dyn WeatherClient>,
    favorites: Arc<dyn FavoritesStore>,
    current: Mutex<GenerationToken>,
    root: CancellationToken,
}

impl EnrichmentCoordinator {
    pub fn new(
        state: Arc<StateStore>,
        weather: Arc<dyn WeatherClient>,
        favorites: Arc<dyn FavoritesStore>,
    ) -> Self {
        let root = CancellationToken::new();
        let current = GenerationToken {
            generation: 0,
            token: root.child_token(),
        };
        Self {
            state,
            weather,
            favorites,
            current: Mutex::new(current),
            root,
        }
    }

    /// Spawn enrichment of `city` under `generation`.
    pub fn enrich(self: &Arc<Self>, city: City, generation: u64) -> JoinHandle<MergeOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.enrich_now(city, generation).await })
    }

    /// Fetch and merge one card inline.
    pub async fn enrich_now(&self, city: City, generation: u64) -> MergeOutcome {
        let token = self.token_for(generation);
        let key = city.search_key();

        let fetch = async {
            tokio::join!(
                self.favorites.is_favorite(&key),
                self.weather.by_coordinates(city.latitude, city.longitude)
            )
        };

        let (favorite, weather) = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Enrichment for {} cancelled (generation {})", key, generation);
                return MergeOutcome::Cancelled;
            }
            results = fetch => results,
        };

        let is_favorite = favorite
            .map_err(|e| tracing::warn!("Favorite lookup for {} failed: {}", key, e))
            .ok();

        let outcome = self.merge(&key, generation, is_favorite, weather.into());
        if outcome != MergeOutcome::Applied {
            tracing::debug!("Discarded enrichment for {}: {:?}", key, outcome);
        }
        outcome
    }

    /// Abort fetches of the current generation. Used when the candidate set is
    /// cleared without a replacement.
    pub fn cancel_in_flight(&self) {
        self.current.lock().token.cancel();
    }

    /// Abort everything, including future enrichments.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Token for `generation`. A newer generation retires the previous
    /// token; an older one gets a token that is already cancelled.
    fn token_for(&self, generation: u64) -> CancellationToken {
        let mut current = self.current.lock();
        if generation > current.generation {
            current.token.cancel();
            current.generation = generation;
            current.token = self.root.child_token();
        }
        if generation == current.generation {
            current.token.clone()
        } else {
            let stale = CancellationToken::new();
            stale.cancel();
            stale
        }
    }

    fn merge(
        &self,
        key: &str,
        generation: u64,
        is_favorite: Option<bool>,
        weather: Resource<WeatherReport>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::Applied;
        self.state.apply(|s| {
            if s.search_generation != generation {
                outcome = MergeOutcome::StaleGeneration;
                return None;
            }
            let Some(card) = s.card_mut(key) else {
                outcome = MergeOutcome::CardGone;
                return None;
            };

            // A toggle that landed while the fetch ran wins over the lookup.
            if let Some(is_favorite) = is_favorite.filter(|_| !card.favorite_settled) {
                card.is_favorite = is_favorite;
                card.favorite_settled = true;
            }
            match weather {
                Resource::Success(report) => {
                    card.weather = Some(report.weather);
                    card.loading_weather = false;
                    card.weather_error = None;
                }
                Resource::Error(message) => {
                    card.weather = None;
                    card.loading_weather = false;
                    card.weather_error = Some(message);
                }
                Resource::Loading => {}
            }
            Some(())
        });
        outcome
    }
}
