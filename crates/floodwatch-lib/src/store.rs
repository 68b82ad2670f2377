//! Relational store of flood alerts, evacuation points and distress calls.
//!
//! [`SqliteStore`] bootstraps its schema on open. Distance ranking happens in
//! Rust with the spherical law of cosines, so the store needs no math
//! extensions. Row counts are small enough that linear scans are fine.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{spherical_cosines_km, Coordinate};
use crate::risk::Severity;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS flood_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    severity TEXT NOT NULL DEFAULT 'LOW',
    alert_type TEXT NOT NULL DEFAULT 'FLOOD',
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS evacuation_points (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'shelter',
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    capacity INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS distress_calls (
    call_id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    user_message TEXT,
    call_time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    rescue_status TEXT NOT NULL DEFAULT 'PENDING'
);
";

/// Rescue status assigned to new distress calls.
pub const PENDING_STATUS: &str = "PENDING";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodAlert {
    pub id: i64,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub alert_type: String,
    pub description: Option<String>,
    pub active: bool,
    pub timestamp: String,
}

impl FloodAlert {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Alert to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFloodAlert {
    pub location_name: String,
    pub coordinate: Coordinate,
    pub severity: Severity,
    pub alert_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacuationPoint {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub point_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity: i64,
}

impl EvacuationPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvacuationPoint {
    pub name: String,
    pub point_type: String,
    pub coordinate: Coordinate,
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressCall {
    pub call_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub user_message: Option<String>,
    pub call_time: String,
    pub rescue_status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDistressCall {
    pub coordinate: Coordinate,
    pub message: Option<String>,
}

/// A store row paired with its distance from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nearby<T> {
    #[serde(flatten)]
    pub item: T,
    /// Distance in kilometers.
    #[serde(rename = "distance")]
    pub distance_km: f64,
}

/// Access to persisted flood data.
///
/// Implementors provide the row-level queries; spatial selections are built
/// on top of them.
pub trait FloodStore: Send + Sync {
    fn active_alerts(&self) -> Result<Vec<FloodAlert>>;

    /// Most recent active alerts, newest first.
    fn recent_active_alerts(&self, limit: usize) -> Result<Vec<FloodAlert>>;

    fn evacuation_points(&self) -> Result<Vec<EvacuationPoint>>;

    /// Insert a distress call and return its id.
    fn insert_distress_call(&self, call: &NewDistressCall) -> Result<i64>;

    /// Most recent distress calls, newest first.
    fn recent_distress_calls(&self, limit: usize) -> Result<Vec<DistressCall>>;

    fn pending_distress_calls(&self) -> Result<Vec<DistressCall>>;

    /// Cheap liveness query.
    fn ping(&self) -> Result<()>;

    /// The `limit` evacuation points closest to `center`.
    fn nearest_evacuation_points(
        &self,
        center: Coordinate,
        limit: usize,
    ) -> Result<Vec<Nearby<EvacuationPoint>>> {
        let mut ranked = with_distance(center, self.evacuation_points()?, |p: &EvacuationPoint| {
            p.coordinate()
        });
        ranked.sort_by(|a, b| cmp_f64(a.distance_km, b.distance_km));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Evacuation points within `radius_km`, largest capacity first.
    fn evacuation_points_within(
        &self,
        center: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Nearby<EvacuationPoint>>> {
        let mut ranked: Vec<_> =
            with_distance(center, self.evacuation_points()?, |p: &EvacuationPoint| {
                p.coordinate()
            })
            .into_iter()
            .filter(|n| n.distance_km <= radius_km)
            .collect();
        ranked.sort_by(|a, b| {
            b.item
                .capacity
                .cmp(&a.item.capacity)
                .then_with(|| cmp_f64(a.distance_km, b.distance_km))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Active alerts within `radius_km`, most severe first.
    fn active_alerts_near(
        &self,
        center: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Nearby<FloodAlert>>> {
        let mut ranked: Vec<_> =
            with_distance(center, self.active_alerts()?, |a: &FloodAlert| a.coordinate())
                .into_iter()
                .filter(|n| n.distance_km <= radius_km)
                .collect();
        ranked.sort_by(|a, b| {
            b.item
                .severity
                .cmp(&a.item.severity)
                .then_with(|| cmp_f64(a.distance_km, b.distance_km))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Number of pending distress calls within `radius_km`.
    fn pending_calls_near(&self, center: Coordinate, radius_km: f64) -> Result<usize> {
        Ok(self
            .pending_distress_calls()?
            .iter()
            .filter(|c| {
                spherical_cosines_km(center, Coordinate::new(c.latitude, c.longitude))
                    <= radius_km
            })
            .count())
    }
}

/// Run a store query on the blocking pool.
pub async fn query<T, F>(store: &Arc<dyn FloodStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn FloodStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| Error::StoreUnavailable {
            message: e.to_string(),
        })?
}

fn with_distance<T>(
    center: Coordinate,
    items: Vec<T>,
    coordinate: impl Fn(&T) -> Coordinate,
) -> Vec<Nearby<T>> {
    items
        .into_iter()
        .map(|item| {
            let distance_km = spherical_cosines_km(center, coordinate(&item));
            Nearby { item, distance_km }
        })
        .filter(|n| n.distance_km.is_finite())
        .collect()
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// SQLite-backed [`FloodStore`].
#[derive(Debug)]
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open(path)?;
        debug!(path = %path.display(), "opened flood store");
        Self::with_connection(connection)
    }

    /// Private in-memory database, mainly for tests and local runs.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| Error::StoreUnavailable {
            message: "connection lock poisoned".to_string(),
        })
    }

    pub fn insert_alert(&self, alert: &NewFloodAlert) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO flood_alerts (location_name, latitude, longitude, severity, alert_type, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                alert.location_name,
                alert.coordinate.latitude,
                alert.coordinate.longitude,
                alert.severity.as_str(),
                alert.alert_type,
                alert.description,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Mark an alert inactive.
    pub fn deactivate_alert(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("UPDATE flood_alerts SET active = 0 WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn insert_evacuation_point(&self, point: &NewEvacuationPoint) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO evacuation_points (name, type, latitude, longitude, capacity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                point.name,
                point.point_type,
                point.coordinate.latitude,
                point.coordinate.longitude,
                point.capacity,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn query_alerts(&self, sql: &str, limit: Option<usize>) -> Result<Vec<FloodAlert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match limit {
            Some(limit) => stmt.query_map([sql_limit(limit)], row_to_alert)?,
            None => stmt.query_map([], row_to_alert)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_calls(&self, sql: &str, limit: Option<usize>) -> Result<Vec<DistressCall>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match limit {
            Some(limit) => stmt.query_map([sql_limit(limit)], row_to_call)?,
            None => stmt.query_map([], row_to_call)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

const ALERT_COLUMNS: &str =
    "id, location_name, latitude, longitude, severity, alert_type, description, active, timestamp";
const CALL_COLUMNS: &str =
    "call_id, latitude, longitude, user_message, call_time, rescue_status";

impl FloodStore for SqliteStore {
    fn active_alerts(&self) -> Result<Vec<FloodAlert>> {
        let sql = format!("SELECT {ALERT_COLUMNS} FROM flood_alerts WHERE active = 1 ORDER BY id");
        self.query_alerts(&sql, None)
    }

    fn recent_active_alerts(&self, limit: usize) -> Result<Vec<FloodAlert>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM flood_alerts WHERE active = 1
             ORDER BY timestamp DESC, id DESC LIMIT ?1"
        );
        self.query_alerts(&sql, Some(limit))
    }

    fn evacuation_points(&self) -> Result<Vec<EvacuationPoint>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, type, latitude, longitude, capacity FROM evacuation_points ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EvacuationPoint {
                id: row.get(0)?,
                name: row.get(1)?,
                point_type: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                capacity: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_distress_call(&self, call: &NewDistressCall) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO distress_calls (latitude, longitude, user_message, rescue_status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                call.coordinate.latitude,
                call.coordinate.longitude,
                call.message,
                PENDING_STATUS,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(call_id = id, "distress call recorded");
        Ok(id)
    }

    fn recent_distress_calls(&self, limit: usize) -> Result<Vec<DistressCall>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM distress_calls ORDER BY call_time DESC, call_id DESC LIMIT ?1"
        );
        self.query_calls(&sql, Some(limit))
    }

    fn pending_distress_calls(&self) -> Result<Vec<DistressCall>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM distress_calls WHERE rescue_status = '{PENDING_STATUS}' ORDER BY call_id"
        );
        self.query_calls(&sql, None)
    }

    fn ping(&self) -> Result<()> {
        let one: i64 = self.conn()?.query_row("SELECT 1", [], |row| row.get(0))?;
        if one == 1 {
            Ok(())
        } else {
            Err(Error::StoreUnavailable {
                message: "unexpected ping result".to_string(),
            })
        }
    }
}

fn row_to_alert(row: &Row<'_>) -> rusqlite::Result<FloodAlert> {
    let severity: String = row.get(4)?;
    Ok(FloodAlert {
        id: row.get(0)?,
        location_name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        severity: Severity::parse_lenient(&severity),
        alert_type: row.get(5)?,
        description: row.get(6)?,
        active: row.get(7)?,
        timestamp: row.get(8)?,
    })
}

fn row_to_call(row: &Row<'_>) -> rusqlite::Result<DistressCall> {
    Ok(DistressCall {
        call_id: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        user_message: row.get(3)?,
        call_time: row.get(4)?,
        rescue_status: row.get(5)?,
    })
}
