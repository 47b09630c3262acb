//! Session state and the store that publishes it.

use std::sync::Arc;

use tokio::sync::watch;

use skycast_weather::{City, WeatherReport, WeatherSnapshot};

/// A candidate city shown while the user types.
#[derive(Debug, Clone, PartialEq)]
pub struct CityCard {
    pub city: City,
    pub weather: Option<WeatherSnapshot>,
    pub is_favorite: bool,
    /// Set once `is_favorite` reflects the store, either from enrichment or
    /// from a toggle. A settled flag is never overwritten by enrichment.
    pub favorite_settled: bool,
    /// True until an enrichment attempt for this card has completed.
    pub loading_weather: bool,
    pub weather_error: Option<String>,
}

impl CityCard {
    pub fn new(city: City) -> Self {
        Self {
            city,
            weather: None,
            is_favorite: false,
            favorite_settled: false,
            loading_weather: true,
            weather_error: None,
        }
    }

    pub fn key(&self) -> String {
        self.city.search_key()
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub query: String,
    pub cards: Vec<CityCard>,
    pub show_cards: bool,
    pub search_generation: u64,
    pub search_in_flight: bool,

    pub selected_city: Option<City>,
    pub detail_weather: Option<WeatherReport>,
    pub detail_error: Option<String>,
    pub detail_loading: bool,
    pub detail_is_favorite: bool,
    pub detail_generation: u64,

    pub favorite_error: Option<String>,
}

impl SessionState {
    pub fn card(&self, key: &str) -> Option<&CityCard> {
        self.cards.iter().find(|c| c.key() == key)
    }

    pub fn card_mut(&mut self, key: &str) -> Option<&mut CityCard> {
        self.cards.iter_mut().find(|c| c.key() == key)
    }

    /// True when every card has finished its enrichment attempt.
    pub fn cards_settled(&self) -> bool {
        self.cards.iter().all(|c| !c.loading_weather)
    }
}

/// Single source of truth for a session.
///
/// Readers subscribe to a watch channel and see whole snapshots. Writers go
/// through [`StateStore::apply`], which runs the transition under the
/// channel's lock so a check and the write it guards cannot interleave with
/// another transition.
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<Arc<SessionState>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(SessionState::default())
    }
}

impl StateStore {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        self.tx.borrow().clone()
    }

    /// Receiver for state changes. Dropping it unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.tx.subscribe()
    }

    /// Run a transition against a working copy of the current state.
    ///
    /// Returning `None` discards the copy and notifies no one; returning
    /// `Some` publishes the copy as the new snapshot.
    pub fn apply<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SessionState) -> Option<R>,
    {
        let mut result = None;
        self.tx.send_if_modified(|current| {
            let mut next = (**current).clone();
            result = f(&mut next);
            if result.is_some() {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        });
        result
    }

    /// Unconditionally publish `state`.
    pub fn replace(&self, state: SessionState) {
        self.tx.send_replace(Arc::new(state));
    }
}
