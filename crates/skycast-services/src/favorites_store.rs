//! SQLite-backed favorites storage.
//!
//! `SqliteFavoritesStore` keeps the favorites list and the pinned city in a
//! local database. The connection sits behind a `parking_lot::Mutex` and every
//! query runs on the blocking pool, so async callers never stall the runtime.
//! Each write runs inside a transaction and publishes the resulting list on a
//! watch channel.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use crate::favorites::{FavoritesResult, FavoritesStore};
use skycast_core::{DatabaseError, RusqliteErrorExt};
use skycast_weather::City;

const PINNED_CITY_KEY: &str = "pinned_city";

/// SQLite-based favorites store.
pub struct SqliteFavoritesStore {
    conn: Arc<Mutex<Connection>>,
    capacity: usize,
    // Published while the connection lock is held so snapshots arrive in commit order.
    list_tx: Arc<watch::Sender<Vec<City>>>,
    pinned_tx: Arc<watch::Sender<Option<String>>>,
}

impl SqliteFavoritesStore {
    /// Open (or create) the favorites database at `path`.
    pub fn new<P: AsRef<Path>>(path: P, capacity: usize) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, capacity)
    }

    /// Create an in-memory store.
    pub fn in_memory(capacity: usize) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, capacity)
    }

    fn from_connection(mut conn: Connection, capacity: usize) -> anyhow::Result<Self> {
        init_schema(&conn)?;

        // Stored rows may predate a smaller configured capacity.
        let tx = conn.transaction()?;
        trim_to_capacity(&tx, capacity)?;
        let cities = load_cities(&tx)?;
        tx.commit()?;
        let pinned = load_pinned(&conn)?;
        tracing::debug!("Opened favorites store with {} entries", cities.len());

        let (list_tx, _) = watch::channel(cities);
        let (pinned_tx, _) = watch::channel(pinned);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            capacity,
            list_tx: Arc::new(list_tx),
            pinned_tx: Arc::new(pinned_tx),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> FavoritesResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut *guard).map_err(|e| e.into_database_error())
        })
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("favorites task failed: {}", e)))?
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS favorites (
            search_key TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            country TEXT NOT NULL,
            state TEXT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            added_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_favorites_position ON favorites(position);

        CREATE TABLE IF NOT EXISTS preferences (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
}

fn row_to_city(row: &rusqlite::Row) -> rusqlite::Result<City> {
    Ok(City {
        name: row.get(0)?,
        country: row.get(1)?,
        state: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
    })
}

fn load_cities(conn: &Connection) -> rusqlite::Result<Vec<City>> {
    let mut stmt = conn.prepare(
        "SELECT name, country, state, latitude, longitude FROM favorites ORDER BY position ASC",
    )?;
    let cities = stmt.query_map([], row_to_city)?.collect::<Result<Vec<_>, _>>()?;
    Ok(cities)
}

fn load_pinned(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM preferences WHERE key = ?1",
        params![PINNED_CITY_KEY],
        |row| row.get(0),
    )
    .optional()
}

/// Move-to-front insert followed by trimming to `capacity`, in one transaction.
fn insert_front(conn: &mut Connection, city: &City, capacity: usize) -> rusqlite::Result<Vec<City>> {
    let tx = conn.transaction()?;
    let key = city.search_key();

    tx.execute("DELETE FROM favorites WHERE search_key = ?1", params![key])?;
    tx.execute("UPDATE favorites SET position = position + 1", [])?;
    tx.execute(
        r#"INSERT INTO favorites
           (search_key, position, name, country, state, latitude, longitude, added_at)
           VALUES (?1, 0, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        params![
            key,
            city.name,
            city.country,
            city.state,
            city.latitude,
            city.longitude,
            Utc::now().to_rfc3339(),
        ],
    )?;
    trim_to_capacity(&tx, capacity)?;

    let cities = load_cities(&tx)?;
    tx.commit()?;
    Ok(cities)
}

/// Delete every row past the first `capacity` positions.
fn trim_to_capacity(conn: &Connection, capacity: usize) -> rusqlite::Result<usize> {
    let dropped = conn.execute(
        r#"DELETE FROM favorites WHERE search_key NOT IN
           (SELECT search_key FROM favorites ORDER BY position ASC LIMIT ?1)"#,
        params![capacity as i64],
    )?;
    if dropped > 0 {
        tracing::debug!("Dropped {} favorite(s) over capacity", dropped);
    }
    Ok(dropped)
}

fn delete_key(conn: &mut Connection, key: &str) -> rusqlite::Result<Option<Vec<City>>> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM favorites WHERE search_key = ?1", params![key])?;
    if removed == 0 {
        return Ok(None);
    }
    let cities = load_cities(&tx)?;
    tx.commit()?;
    Ok(Some(cities))
}

#[async_trait]
impl FavoritesStore for SqliteFavoritesStore {
    async fn add(&self, city: &City) -> FavoritesResult<()> {
        let city = city.clone();
        let capacity = self.capacity;
        let list_tx = self.list_tx.clone();
        self.with_conn(move |conn| {
            let cities = insert_front(conn, &city, capacity)?;
            list_tx.send_replace(cities);
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> FavoritesResult<()> {
        let key = key.to_string();
        let list_tx = self.list_tx.clone();
        self.with_conn(move |conn| {
            if let Some(cities) = delete_key(conn, &key)? {
                list_tx.send_replace(cities);
            }
            Ok(())
        })
        .await
    }

    async fn is_favorite(&self, key: &str) -> FavoritesResult<bool> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM favorites WHERE search_key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    fn list(&self) -> watch::Receiver<Vec<City>> {
        self.list_tx.subscribe()
    }

    fn pinned_city_name(&self) -> watch::Receiver<Option<String>> {
        self.pinned_tx.subscribe()
    }

    async fn save_pinned_city_name(&self, name: &str) -> FavoritesResult<()> {
        let value = name.to_string();
        let pinned_tx = self.pinned_tx.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                params![PINNED_CITY_KEY, value],
            )?;
            pinned_tx.send_replace(Some(value));
            Ok(())
        })
        .await
    }
}
