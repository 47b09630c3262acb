//! Debounced incremental city search.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::detail::DetailController;
use crate::enrichment::EnrichmentCoordinator;
use crate::state::{CityCard, StateStore};
use skycast_core::SearchConfig;
use skycast_weather::{City, GeoSearchClient};

/// Tuning for the incremental search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_query_chars: usize,
    pub max_cards: usize,
    pub geo_result_limit: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            debounce: config.debounce(),
            min_query_chars: config.min_query_chars,
            max_cards: config.max_cards,
            geo_result_limit: config.geo_result_limit,
        }
    }
}

/// Keep the first candidate for each search key, up to `max` cards.
pub fn distinct_candidates(cities: Vec<City>, max: usize) -> Vec<City> {
    let mut distinct: Vec<City> = Vec::with_capacity(max);
    for city in cities {
        if distinct.len() == max {
            break;
        }
        if !distinct.iter().any(|c| c.same_city(&city)) {
            distinct.push(city);
        }
    }
    distinct
}

/// Turns query edits into at most one search per quiet period.
pub struct SearchOrchestrator {
    state: Arc<StateStore>,
    geo: Arc<dyn GeoSearchClient>,
    enrichment: Arc<EnrichmentCoordinator>,
    detail: Arc<DetailController>,
    settings: SearchSettings,
    pending: Mutex<Option<CancellationToken>>,
}

impl SearchOrchestrator {
    pub fn new(
        state: Arc<StateStore>,
        geo: Arc<dyn GeoSearchClient>,
        enrichment: Arc<EnrichmentCoordinator>,
        detail: Arc<DetailController>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            state,
            geo,
            enrichment,
            detail,
            settings,
            pending: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Record the new query text and (re)schedule the search for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_query_changed(&self, text: &str) {
        let trimmed = text.trim().to_string();
        let too_short = trimmed.chars().count() < self.settings.min_query_chars;

        // Held until the new token is installed so overlapping calls cannot
        // both believe they own the pending search.
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.cancel();
        }

        self.state.apply(|s| {
            s.query = text.to_string();
            s.show_cards = !trimmed.is_empty();
            if too_short {
                s.search_generation += 1;
                s.cards.clear();
                s.search_in_flight = false;
                s.show_cards = false;
            } else {
                s.search_in_flight = true;
            }
            Some(())
        });

        if too_short {
            drop(pending);
            self.enrichment.cancel_in_flight();
            return;
        }

        let token = CancellationToken::new();
        *pending = Some(token.clone());
        drop(pending);

        let task = SearchTask {
            state: Arc::clone(&self.state),
            geo: Arc::clone(&self.geo),
            enrichment: Arc::clone(&self.enrichment),
            settings: self.settings.clone(),
            token,
        };
        tokio::spawn(task.run(trimmed));
    }

    /// Hide the candidate panel without touching the cards.
    pub fn hide_city_cards(&self) {
        self.state.apply(|s| {
            if !s.show_cards {
                return None;
            }
            s.show_cards = false;
            Some(())
        });
    }

    /// Abort the pending debounce or in-flight search, if any.
    pub fn cancel_pending(&self) {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
            self.state.apply(|s| {
                if !s.search_in_flight {
                    return None;
                }
                s.search_in_flight = false;
                Some(())
            });
        }
    }

    /// Stop searching and open `city` in the detail view.
    pub async fn select_city(&self, city: City) {
        self.cancel_pending();
        self.enrichment.cancel_in_flight();
        self.detail.select_city(city).await;
    }
}

struct SearchTask {
    state: Arc<StateStore>,
    geo: Arc<dyn GeoSearchClient>,
    enrichment: Arc<EnrichmentCoordinator>,
    settings: SearchSettings,
    token: CancellationToken,
}

impl SearchTask {
    async fn run(self, query: String) {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => return,
            _ = tokio::time::sleep(self.settings.debounce) => {}
        }

        tracing::debug!("Searching cities for {:?}", query);
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                tracing::debug!("Search for {:?} superseded", query);
                return;
            }
            result = self.geo.search(&query, self.settings.geo_result_limit) => result,
        };

        match result {
            Ok(cities) => self.complete(distinct_candidates(cities, self.settings.max_cards)),
            Err(e) => {
                tracing::warn!("City search for {:?} failed: {}", query, e);
                self.fail();
            }
        }
    }

    fn complete(&self, cities: Vec<City>) {
        let token = &self.token;
        let published = self.state.apply(|s| {
            if token.is_cancelled() {
                return None;
            }
            s.search_generation += 1;
            s.cards = cities.iter().cloned().map(CityCard::new).collect();
            s.search_in_flight = false;
            Some(s.search_generation)
        });

        let Some(generation) = published else {
            return;
        };

        tracing::debug!("Enriching {} card(s) for generation {}", cities.len(), generation);
        for city in cities {
            self.enrichment.enrich(city, generation);
        }
    }

    fn fail(&self) {
        let token = &self.token;
        let cleared = self.state.apply(|s| {
            if token.is_cancelled() {
                return None;
            }
            s.search_generation += 1;
            s.cards.clear();
            s.search_in_flight = false;
            Some(())
        });
        if cleared.is_some() {
            self.enrichment.cancel_in_flight();
        }
    }
}
