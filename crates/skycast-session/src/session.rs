//! The session facade: wires the controllers around one state store.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::detail::DetailController;
use crate::enrichment::EnrichmentCoordinator;
use crate::favorites::FavoriteToggleController;
use crate::search::{SearchOrchestrator, SearchSettings};
use crate::state::{SessionState, StateStore};
use skycast_core::DatabaseError;
use skycast_services::FavoritesStore;
use skycast_weather::{City, GeoSearchClient, WeatherClient};

/// Remote collaborators a session talks to.
#[derive(Clone)]
pub struct SessionClients {
    pub geo: Arc<dyn GeoSearchClient>,
    pub weather: Arc<dyn WeatherClient>,
}

impl SessionClients {
    /// Use one client for both geocoding and weather.
    pub fn shared<C>(client: Arc<C>) -> Self
    where
        C: GeoSearchClient + WeatherClient + 'static,
    {
        Self {
            geo: client.clone(),
            weather: client,
        }
    }
}

pub struct Session {
    state: Arc<StateStore>,
    store: Arc<dyn FavoritesStore>,
    search: SearchOrchestrator,
    enrichment: Arc<EnrichmentCoordinator>,
    detail: Arc<DetailController>,
    favorites: FavoriteToggleController,
    shutdown: CancellationToken,
    pinned_follower: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        clients: SessionClients,
        store: Arc<dyn FavoritesStore>,
        settings: SearchSettings,
    ) -> Self {
        let state = Arc::new(StateStore::default());
        let enrichment = Arc::new(EnrichmentCoordinator::new(
            state.clone(),
            clients.weather.clone(),
            store.clone(),
        ));
        let detail = Arc::new(DetailController::new(
            state.clone(),
            clients.weather,
            store.clone(),
        ));
        let search = SearchOrchestrator::new(
            state.clone(),
            clients.geo,
            enrichment.clone(),
            detail.clone(),
            settings,
        );
        let favorites = FavoriteToggleController::new(state.clone(), store.clone());

        Self {
            state,
            store,
            search,
            enrichment,
            detail,
            favorites,
            shutdown: CancellationToken::new(),
            pinned_follower: Mutex::new(None),
        }
    }

    /// Start background work: the pinned city follower.
    ///
    /// Any non-empty pinned name the store publishes is written into the
    /// query. No search is triggered. Calling `start` twice is a no-op.
    pub fn start(&self) {
        let mut follower = self.pinned_follower.lock();
        if follower.is_some() {
            return;
        }

        let mut pinned = self.store.pinned_city_name();
        let state = self.state.clone();
        let token = self.shutdown.child_token();

        *follower = Some(tokio::spawn(async move {
            loop {
                let name = pinned.borrow_and_update().clone();
                if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
                    state.apply(|s| {
                        if s.query == name {
                            return None;
                        }
                        tracing::debug!("Restoring pinned city {:?}", name);
                        s.query = name;
                        Some(())
                    });
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = pinned.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }));
        tracing::info!("Session started");
    }

    pub fn on_query_changed(&self, text: &str) {
        self.search.on_query_changed(text);
    }

    pub fn hide_city_cards(&self) {
        self.search.hide_city_cards();
    }

    pub async fn select_city(&self, city: City) {
        self.search.select_city(city).await;
    }

    pub async fn search_weather(&self) {
        self.search.cancel_pending();
        self.detail.search_weather().await;
    }

    pub async fn retry(&self) {
        self.detail.retry().await;
    }

    pub fn clear_error(&self) {
        self.detail.clear_error();
    }

    pub async fn toggle_favorite(&self, city: &City) -> Result<bool, DatabaseError> {
        self.favorites.toggle(city).await
    }

    pub async fn toggle_detail_favorite(&self, city: &City) -> Result<bool, DatabaseError> {
        self.favorites.toggle_detail(city).await
    }

    pub async fn toggle_current_favorite(&self) -> Result<Option<bool>, DatabaseError> {
        self.favorites.toggle_current().await
    }

    pub async fn remove_favorite(&self, city: &City) -> Result<(), DatabaseError> {
        self.favorites.remove(city).await
    }

    pub fn clear_favorite_error(&self) {
        self.favorites.clear_favorite_error();
    }

    /// Persist the trimmed query as the pinned city.
    ///
    /// Returns `Ok(false)` without touching the store when the query is blank.
    pub async fn save_pinned_city(&self) -> Result<bool, DatabaseError> {
        let name = self.state.snapshot().query.trim().to_string();
        if name.is_empty() {
            return Ok(false);
        }
        self.store.save_pinned_city_name(&name).await?;
        tracing::info!("Pinned city set to {:?}", name);
        Ok(true)
    }

    /// Stream of the favorites list, most recent first.
    pub fn favorites(&self) -> watch::Receiver<Vec<City>> {
        self.store.list()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        self.state.snapshot()
    }

    pub fn search(&self) -> &SearchOrchestrator {
        &self.search
    }

    pub fn enrichment(&self) -> &Arc<EnrichmentCoordinator> {
        &self.enrichment
    }

    pub fn detail(&self) -> &DetailController {
        &self.detail
    }

    pub fn favorite_controller(&self) -> &FavoriteToggleController {
        &self.favorites
    }

    /// Cancel pending searches, enrichment and background tasks.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down session");
        self.search.cancel_pending();
        self.enrichment.shutdown();
        self.shutdown.cancel();
        if let Some(handle) = self.pinned_follower.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.search.cancel_pending();
        self.shutdown.cancel();
        self.enrichment.shutdown();
    }
}
