use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use crate::domain::models::{
    ChargerStatus, Consumer, Operator, Outlet, Rating, Reservation, Session, Station,
};

pub const LATEST_SCHEMA_VERSION: u32 = 4;

const MIGRATIONS: &[(u32, &str)] = &[
    (
        1,
        r#"
CREATE TABLE IF NOT EXISTS operators (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    operator_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS consumers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    status TEXT NOT NULL,
    operator_id INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stations_operator_id
ON stations (operator_id);

CREATE TABLE IF NOT EXISTS outlets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    station_id INTEGER,
    status TEXT NOT NULL,
    cost_per_hour REAL NOT NULL,
    max_power_kw REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_outlets_station_id
ON outlets (station_id);
"#,
    ),
    (
        2,
        r#"
CREATE TABLE IF NOT EXISTS reservations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    consumer_id INTEGER NOT NULL,
    station_id INTEGER NOT NULL,
    outlet_id INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reservations_consumer_start
ON reservations (consumer_id, start_time);

CREATE INDEX IF NOT EXISTS idx_reservations_outlet_start
ON reservations (outlet_id, start_time);

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    consumer_id INTEGER NOT NULL,
    station_id INTEGER NOT NULL,
    outlet_id INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active_per_consumer
ON sessions (consumer_id) WHERE end_time IS NULL;

CREATE INDEX IF NOT EXISTS idx_sessions_active_outlet
ON sessions (outlet_id) WHERE end_time IS NULL;

CREATE INDEX IF NOT EXISTS idx_sessions_consumer_end
ON sessions (consumer_id, end_time);
"#,
    ),
    (
        3,
        r#"
CREATE TABLE IF NOT EXISTS ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    consumer_id INTEGER NOT NULL,
    station_id INTEGER NOT NULL,
    stars INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
    comment TEXT
);

CREATE INDEX IF NOT EXISTS idx_ratings_station_id
ON ratings (station_id);
"#,
    ),
    (
        4,
        r#"
ALTER TABLE sessions ADD COLUMN cost_per_hour REAL NOT NULL DEFAULT 0;
ALTER TABLE sessions ADD COLUMN max_power_kw REAL NOT NULL DEFAULT 0;

UPDATE sessions
SET cost_per_hour = (SELECT o.cost_per_hour FROM outlets o WHERE o.id = sessions.outlet_id),
    max_power_kw = (SELECT o.max_power_kw FROM outlets o WHERE o.id = sessions.outlet_id)
WHERE EXISTS (SELECT 1 FROM outlets o WHERE o.id = sessions.outlet_id);
"#,
    ),
];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(connection)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

impl ToSql for ChargerStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChargerStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

// -- directory --

#[derive(Debug, Clone, PartialEq)]
pub struct NewOperator {
    pub email: String,
    pub password_hash: String,
    pub operator_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConsumer {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

pub fn insert_operator(connection: &Connection, operator: &NewOperator) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO operators (email, password_hash, operator_type) VALUES (?1, ?2, ?3)",
        params![operator.email, operator.password_hash, operator.operator_type],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_operator(connection: &Connection, id: i64) -> Result<Option<Operator>, DbError> {
    let operator = connection
        .query_row(
            "SELECT id, email, password_hash, operator_type FROM operators WHERE id = ?1",
            params![id],
            operator_from_row,
        )
        .optional()?;
    Ok(operator)
}

pub fn find_operator_by_email(
    connection: &Connection,
    email: &str,
) -> Result<Option<Operator>, DbError> {
    let operator = connection
        .query_row(
            "SELECT id, email, password_hash, operator_type FROM operators WHERE email = ?1",
            params![email],
            operator_from_row,
        )
        .optional()?;
    Ok(operator)
}

pub fn update_operator_password(
    connection: &Connection,
    id: i64,
    password_hash: &str,
) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE operators SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id],
    )?;
    Ok(changed)
}

pub fn insert_consumer(connection: &Connection, consumer: &NewConsumer) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO consumers (email, password_hash, name) VALUES (?1, ?2, ?3)",
        params![consumer.email, consumer.password_hash, consumer.name],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_consumer(connection: &Connection, id: i64) -> Result<Option<Consumer>, DbError> {
    let consumer = connection
        .query_row(
            "SELECT id, email, password_hash, name FROM consumers WHERE id = ?1",
            params![id],
            consumer_from_row,
        )
        .optional()?;
    Ok(consumer)
}

pub fn find_consumer_by_email(
    connection: &Connection,
    email: &str,
) -> Result<Option<Consumer>, DbError> {
    let consumer = connection
        .query_row(
            "SELECT id, email, password_hash, name FROM consumers WHERE email = ?1",
            params![email],
            consumer_from_row,
        )
        .optional()?;
    Ok(consumer)
}

pub fn update_consumer_password(
    connection: &Connection,
    id: i64,
    password_hash: &str,
) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE consumers SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id],
    )?;
    Ok(changed)
}

fn operator_from_row(row: &Row<'_>) -> rusqlite::Result<Operator> {
    Ok(Operator {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        operator_type: row.get(3)?,
    })
}

fn consumer_from_row(row: &Row<'_>) -> rusqlite::Result<Consumer> {
    Ok(Consumer {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
    })
}

// -- stations --

const STATION_COLUMNS: &str = "id, latitude, longitude, status, operator_id";

pub fn insert_station(
    connection: &Connection,
    operator_id: i64,
    latitude: f64,
    longitude: f64,
    status: ChargerStatus,
) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO stations (latitude, longitude, status, operator_id) VALUES (?1, ?2, ?3, ?4)",
        params![latitude, longitude, status, operator_id],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_station(connection: &Connection, id: i64) -> Result<Option<Station>, DbError> {
    let station = connection
        .query_row(
            &format!("SELECT {STATION_COLUMNS} FROM stations WHERE id = ?1"),
            params![id],
            station_from_row,
        )
        .optional()?;
    Ok(station)
}

pub fn list_stations_by_operator(
    connection: &Connection,
    operator_id: i64,
) -> Result<Vec<Station>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {STATION_COLUMNS} FROM stations WHERE operator_id = ?1 ORDER BY id"
    ))?;
    let rows = statement.query_map(params![operator_id], station_from_row)?;
    collect_rows(rows)
}

/// All stations, or only those in `status` when given.
pub fn list_stations(
    connection: &Connection,
    status: Option<ChargerStatus>,
) -> Result<Vec<Station>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {STATION_COLUMNS} FROM stations
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY id"
    ))?;
    let rows = statement.query_map(params![status], station_from_row)?;
    collect_rows(rows)
}

pub fn update_station_status(
    connection: &Connection,
    id: i64,
    status: ChargerStatus,
) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE stations SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    Ok(changed)
}

pub fn delete_station(connection: &Connection, id: i64) -> Result<usize, DbError> {
    let changed = connection.execute("DELETE FROM stations WHERE id = ?1", params![id])?;
    Ok(changed)
}

fn station_from_row(row: &Row<'_>) -> rusqlite::Result<Station> {
    Ok(Station {
        id: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        status: row.get(3)?,
        operator_id: row.get(4)?,
    })
}

// -- outlets --

const OUTLET_COLUMNS: &str = "id, station_id, status, cost_per_hour, max_power_kw";

#[derive(Debug, Clone, PartialEq)]
pub struct NewOutlet {
    pub station_id: Option<i64>,
    pub status: ChargerStatus,
    pub cost_per_hour: f64,
    pub max_power_kw: f64,
}

pub fn insert_outlet(connection: &Connection, outlet: &NewOutlet) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO outlets (station_id, status, cost_per_hour, max_power_kw) VALUES (?1, ?2, ?3, ?4)",
        params![
            outlet.station_id,
            outlet.status,
            outlet.cost_per_hour,
            outlet.max_power_kw
        ],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_outlet(connection: &Connection, id: i64) -> Result<Option<Outlet>, DbError> {
    let outlet = connection
        .query_row(
            &format!("SELECT {OUTLET_COLUMNS} FROM outlets WHERE id = ?1"),
            params![id],
            outlet_from_row,
        )
        .optional()?;
    Ok(outlet)
}

pub fn list_outlets_by_station(
    connection: &Connection,
    station_id: i64,
) -> Result<Vec<Outlet>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {OUTLET_COLUMNS} FROM outlets WHERE station_id = ?1 ORDER BY id"
    ))?;
    let rows = statement.query_map(params![station_id], outlet_from_row)?;
    collect_rows(rows)
}

pub fn list_outlets(connection: &Connection) -> Result<Vec<Outlet>, DbError> {
    let mut statement =
        connection.prepare(&format!("SELECT {OUTLET_COLUMNS} FROM outlets ORDER BY id"))?;
    let rows = statement.query_map([], outlet_from_row)?;
    collect_rows(rows)
}

pub fn update_outlet_station(
    connection: &Connection,
    id: i64,
    station_id: Option<i64>,
) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE outlets SET station_id = ?1 WHERE id = ?2",
        params![station_id, id],
    )?;
    Ok(changed)
}

pub fn update_outlet_status(
    connection: &Connection,
    id: i64,
    status: ChargerStatus,
) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE outlets SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    Ok(changed)
}

/// Puts an OCCUPIED outlet back to AVAILABLE; any other status is left as set.
pub fn release_outlet(connection: &Connection, id: i64) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE outlets SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![ChargerStatus::Available, id, ChargerStatus::Occupied],
    )?;
    Ok(changed)
}

pub fn detach_outlets_of_station(connection: &Connection, station_id: i64) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE outlets SET station_id = NULL WHERE station_id = ?1",
        params![station_id],
    )?;
    Ok(changed)
}

pub fn delete_outlet(connection: &Connection, id: i64) -> Result<usize, DbError> {
    let changed = connection.execute("DELETE FROM outlets WHERE id = ?1", params![id])?;
    Ok(changed)
}

fn outlet_from_row(row: &Row<'_>) -> rusqlite::Result<Outlet> {
    Ok(Outlet {
        id: row.get(0)?,
        station_id: row.get(1)?,
        status: row.get(2)?,
        cost_per_hour: row.get(3)?,
        max_power_kw: row.get(4)?,
    })
}

// -- reservations --

const RESERVATION_COLUMNS: &str = "id, consumer_id, station_id, outlet_id, start_time, end_time";

#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub consumer_id: i64,
    pub station_id: i64,
    pub outlet_id: i64,
    pub start_time: String,
    pub end_time: String,
}

pub fn insert_reservation(
    connection: &Connection,
    reservation: &NewReservation,
) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO reservations (consumer_id, station_id, outlet_id, start_time, end_time) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            reservation.consumer_id,
            reservation.station_id,
            reservation.outlet_id,
            reservation.start_time,
            reservation.end_time
        ],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_reservation(connection: &Connection, id: i64) -> Result<Option<Reservation>, DbError> {
    let reservation = connection
        .query_row(
            &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1"),
            params![id],
            reservation_from_row,
        )
        .optional()?;
    Ok(reservation)
}

pub fn list_reservations_by_consumer(
    connection: &Connection,
    consumer_id: i64,
) -> Result<Vec<Reservation>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations
         WHERE consumer_id = ?1
         ORDER BY start_time ASC, id ASC"
    ))?;
    let rows = statement.query_map(params![consumer_id], reservation_from_row)?;
    collect_rows(rows)
}

/// Half-open windows: a reservation ending exactly when another starts does
/// not overlap it.
pub fn count_overlapping_reservations(
    connection: &Connection,
    outlet_id: i64,
    start_time: &str,
    end_time: &str,
) -> Result<i64, DbError> {
    let count = connection.query_row(
        "SELECT COUNT(*) FROM reservations
         WHERE outlet_id = ?1 AND start_time < ?3 AND end_time > ?2",
        params![outlet_id, start_time, end_time],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        consumer_id: row.get(1)?,
        station_id: row.get(2)?,
        outlet_id: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
    })
}

// -- sessions --

const SESSION_COLUMNS: &str = "id, consumer_id, station_id, outlet_id, start_time, end_time";

#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub consumer_id: i64,
    pub station_id: i64,
    pub outlet_id: i64,
    pub start_time: String,
    pub cost_per_hour: f64,
    pub max_power_kw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUsageRow {
    pub start_time: String,
    pub end_time: String,
    pub cost_per_hour: f64,
    pub max_power_kw: f64,
}

pub fn insert_session(connection: &Connection, session: &NewSession) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO sessions (consumer_id, station_id, outlet_id, start_time, cost_per_hour, max_power_kw)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            session.consumer_id,
            session.station_id,
            session.outlet_id,
            session.start_time,
            session.cost_per_hour,
            session.max_power_kw
        ],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_session(connection: &Connection, id: i64) -> Result<Option<Session>, DbError> {
    let session = connection
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

pub fn get_active_session_for_consumer(
    connection: &Connection,
    consumer_id: i64,
) -> Result<Option<Session>, DbError> {
    let session = connection
        .query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE consumer_id = ?1 AND end_time IS NULL"
            ),
            params![consumer_id],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

pub fn get_active_session_for_outlet(
    connection: &Connection,
    outlet_id: i64,
) -> Result<Option<Session>, DbError> {
    let session = connection
        .query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE outlet_id = ?1 AND end_time IS NULL
                 ORDER BY id LIMIT 1"
            ),
            params![outlet_id],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

/// Active sessions started at the station or running on an outlet currently
/// attached to it.
pub fn count_active_sessions_for_station(
    connection: &Connection,
    station_id: i64,
) -> Result<i64, DbError> {
    let count = connection.query_row(
        "SELECT COUNT(*) FROM sessions
         WHERE end_time IS NULL
           AND (station_id = ?1
                OR outlet_id IN (SELECT id FROM outlets WHERE station_id = ?1))",
        params![station_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Only touches a still-open session; closed rows are never rewritten.
pub fn close_session(connection: &Connection, id: i64, end_time: &str) -> Result<usize, DbError> {
    let changed = connection.execute(
        "UPDATE sessions SET end_time = ?1 WHERE id = ?2 AND end_time IS NULL",
        params![end_time, id],
    )?;
    Ok(changed)
}

pub fn list_closed_sessions_by_consumer(
    connection: &Connection,
    consumer_id: i64,
) -> Result<Vec<Session>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions
         WHERE consumer_id = ?1 AND end_time IS NOT NULL
         ORDER BY end_time DESC, id DESC"
    ))?;
    let rows = statement.query_map(params![consumer_id], session_from_row)?;
    collect_rows(rows)
}

/// Uses the tariff captured when each session started, so history stays
/// complete after an outlet is repriced or deleted.
pub fn list_session_usage_by_consumer(
    connection: &Connection,
    consumer_id: i64,
) -> Result<Vec<SessionUsageRow>, DbError> {
    let mut statement = connection.prepare(
        "SELECT start_time, end_time, cost_per_hour, max_power_kw
         FROM sessions
         WHERE consumer_id = ?1 AND end_time IS NOT NULL
         ORDER BY id",
    )?;
    let rows = statement.query_map(params![consumer_id], |row| {
        Ok(SessionUsageRow {
            start_time: row.get(0)?,
            end_time: row.get(1)?,
            cost_per_hour: row.get(2)?,
            max_power_kw: row.get(3)?,
        })
    })?;
    collect_rows(rows)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        consumer_id: row.get(1)?,
        station_id: row.get(2)?,
        outlet_id: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
    })
}

// -- ratings --

const RATING_COLUMNS: &str = "id, consumer_id, station_id, stars, comment";

#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub consumer_id: i64,
    pub station_id: i64,
    pub stars: u8,
    pub comment: Option<String>,
}

pub fn insert_rating(connection: &Connection, rating: &NewRating) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO ratings (consumer_id, station_id, stars, comment) VALUES (?1, ?2, ?3, ?4)",
        params![
            rating.consumer_id,
            rating.station_id,
            rating.stars,
            rating.comment
        ],
    )?;
    Ok(connection.last_insert_rowid())
}

pub fn get_rating(connection: &Connection, id: i64) -> Result<Option<Rating>, DbError> {
    let rating = connection
        .query_row(
            &format!("SELECT {RATING_COLUMNS} FROM ratings WHERE id = ?1"),
            params![id],
            rating_from_row,
        )
        .optional()?;
    Ok(rating)
}

pub fn list_ratings_by_station(
    connection: &Connection,
    station_id: i64,
) -> Result<Vec<Rating>, DbError> {
    let mut statement = connection.prepare(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE station_id = ?1 ORDER BY id"
    ))?;
    let rows = statement.query_map(params![station_id], rating_from_row)?;
    collect_rows(rows)
}

pub fn delete_ratings_of_station(connection: &Connection, station_id: i64) -> Result<usize, DbError> {
    let changed = connection.execute(
        "DELETE FROM ratings WHERE station_id = ?1",
        params![station_id],
    )?;
    Ok(changed)
}

fn rating_from_row(row: &Row<'_>) -> rusqlite::Result<Rating> {
    Ok(Rating {
        id: row.get(0)?,
        consumer_id: row.get(1)?,
        station_id: row.get(2)?,
        stars: row.get(3)?,
        comment: row.get(4)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, DbError> {
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}
