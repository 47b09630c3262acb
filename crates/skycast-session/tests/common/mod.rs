//! Scripted collaborators for session tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use skycast_core::{DatabaseError, NetworkError, WeatherError};
use skycast_services::{FavoritesResult, FavoritesStore, MemoryFavoritesStore};
use skycast_session::{SearchSettings, Session, SessionClients, SessionState};
use skycast_weather::{City, GeoSearchClient, WeatherClient, WeatherReport, WeatherSnapshot};

pub fn london() -> City {
    City::new("London", "GB", Some("England".to_string()), 51.5073, -0.1276)
}

pub fn los_angeles() -> City {
    City::new("Los Angeles", "US", Some("California".to_string()), 34.0522, -118.2437)
}

pub fn paris() -> City {
    City::new("Paris", "FR", None, 48.8566, 2.3522)
}

pub fn rome() -> City {
    City::new("Rome", "IT", None, 41.9028, 12.4964)
}

pub fn report(name: &str, country: &str, temperature_k: f64) -> WeatherReport {
    WeatherReport {
        city_name: name.to_string(),
        country: country.to_string(),
        weather: WeatherSnapshot {
            temperature_k,
            feels_like_k: temperature_k + 2.0,
            min_k: temperature_k - 2.0,
            max_k: temperature_k + 2.0,
            humidity_pct: 55,
            condition_main: "Clouds".to_string(),
            condition_description: "broken clouds".to_string(),
            icon_id: "04d".to_string(),
        },
    }
}

pub fn report_for(city: &City, temperature_k: f64) -> WeatherReport {
    report(&city.name, &city.country, temperature_k)
}

#[derive(Clone)]
struct Scripted<T> {
    delay: Duration,
    result: Result<T, WeatherError>,
}

/// Geocoding fake answering by exact query text.
#[derive(Default)]
pub struct FakeGeo {
    responses: Mutex<HashMap<String, Scripted<Vec<City>>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGeo {
    pub fn respond(&self, query: &str, cities: Vec<City>) {
        self.respond_after(query, Duration::ZERO, cities);
    }

    pub fn respond_after(&self, query: &str, delay: Duration, cities: Vec<City>) {
        self.responses.lock().insert(
            query.to_string(),
            Scripted {
                delay,
                result: Ok(cities),
            },
        );
    }

    pub fn fail(&self, query: &str, error: WeatherError) {
        self.responses.lock().insert(
            query.to_string(),
            Scripted {
                delay: Duration::ZERO,
                result: Err(error),
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl GeoSearchClient for FakeGeo {
    async fn search(&self, query: &str, _limit: u32) -> Result<Vec<City>, WeatherError> {
        self.calls.lock().push(query.to_string());
        let scripted = self.responses.lock().get(query).cloned();
        match scripted {
            Some(s) => {
                tokio::time::sleep(s.delay).await;
                s.result
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Weather fake answering by coordinates or by lowercase name.
#[derive(Default)]
pub struct FakeWeather {
    by_coords: Mutex<HashMap<String, Scripted<WeatherReport>>>,
    by_name: Mutex<HashMap<String, Scripted<WeatherReport>>>,
    calls: Mutex<Vec<String>>,
}

fn coord_key(lat: f64, lon: f64) -> String {
    format!("{},{}", lat, lon)
}

impl FakeWeather {
    pub fn city(&self, city: &City, delay: Duration, result: Result<WeatherReport, WeatherError>) {
        self.by_coords.lock().insert(
            coord_key(city.latitude, city.longitude),
            Scripted { delay, result },
        );
    }

    pub fn city_ok(&self, city: &City, temperature_k: f64) {
        self.city(city, Duration::ZERO, Ok(report_for(city, temperature_k)));
    }

    pub fn name(&self, name: &str, delay: Duration, result: Result<WeatherReport, WeatherError>) {
        self.by_name
            .lock()
            .insert(name.to_lowercase(), Scripted { delay, result });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl WeatherClient for FakeWeather {
    async fn by_name(&self, name: &str) -> Result<WeatherReport, WeatherError> {
        self.calls.lock().push(format!("name:{}", name));
        let scripted = self.by_name.lock().get(&name.to_lowercase()).cloned();
        match scripted {
            Some(s) => {
                tokio::time::sleep(s.delay).await;
                s.result
            }
            None => Err(WeatherError::NotFound),
        }
    }

    async fn by_coordinates(&self, lat: f64, lon: f64) -> Result<WeatherReport, WeatherError> {
        let key = coord_key(lat, lon);
        self.calls.lock().push(format!("coords:{}", key));
        let scripted = self.by_coords.lock().get(&key).cloned();
        match scripted {
            Some(s) => {
                tokio::time::sleep(s.delay).await;
                s.result
            }
            None => Err(WeatherError::Network(NetworkError::ConnectionFailed(
                "unscripted".to_string(),
            ))),
        }
    }
}

/// Favorites store that can be switched into failing reads or writes.
pub struct FlakyFavorites {
    inner: MemoryFavoritesStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl Default for FlakyFavorites {
    fn default() -> Self {
        Self {
            inner: MemoryFavoritesStore::default(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl FlakyFavorites {
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<City> {
        self.inner.snapshot()
    }

    fn check(&self, flag: &AtomicBool) -> FavoritesResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryFailed("disk I/O error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FavoritesStore for FlakyFavorites {
    async fn add(&self, city: &City) -> FavoritesResult<()> {
        self.check(&self.fail_writes)?;
        self.inner.add(city).await
    }

    async fn remove(&self, key: &str) -> FavoritesResult<()> {
        self.check(&self.fail_writes)?;
        self.inner.remove(key).await
    }

    async fn is_favorite(&self, key: &str) -> FavoritesResult<bool> {
        self.check(&self.fail_reads)?;
        self.inner.is_favorite(key).await
    }

    fn list(&self) -> watch::Receiver<Vec<City>> {
        self.inner.list()
    }

    fn pinned_city_name(&self) -> watch::Receiver<Option<String>> {
        self.inner.pinned_city_name()
    }

    async fn save_pinned_city_name(&self, name: &str) -> FavoritesResult<()> {
        self.check(&self.fail_writes)?;
        self.inner.save_pinned_city_name(name).await
    }
}

pub struct Harness {
    pub geo: Arc<FakeGeo>,
    pub weather: Arc<FakeWeather>,
    pub store: Arc<FlakyFavorites>,
    pub session: Session,
}

impl Harness {
    pub fn new() -> Self {
        let geo = Arc::new(FakeGeo::default());
        let weather = Arc::new(FakeWeather::default());
        let store = Arc::new(FlakyFavorites::default());
        let session = Session::new(
            SessionClients {
                geo: geo.clone(),
                weather: weather.clone(),
            },
            store.clone(),
            SearchSettings::default(),
        );
        Self {
            geo,
            weather,
            store,
            session,
        }
    }

    /// Wait (in virtual time) until `pred` holds for the session state.
    pub async fn wait_for<F>(&self, pred: F) -> Arc<SessionState>
    where
        F: Fn(&SessionState) -> bool,
    {
        let mut rx = self.session.subscribe();
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let state = rx.borrow_and_update().clone();
                if pred(&state) {
                    return state;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("state condition not reached")
    }

    /// Type `text` and wait until the search it triggers has settled.
    pub async fn search(&self, text: &str) -> Arc<SessionState> {
        self.session.on_query_changed(text);
        self.wait_for(|s| !s.search_in_flight && s.cards_settled()).await
    }
}

/// Let spawned tasks run and virtual time advance by `duration`.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}
