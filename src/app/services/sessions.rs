use std::sync::Arc;

use super::directory::require_consumer;
use super::outlets::require_outlet;
use super::stations::require_station;
use super::{ServiceError, Store};
use crate::adapters::db::{self, NewSession};
use crate::domain::clock::{Clock, TimestampMs};
use crate::domain::models::{ChargerStatus, Session};
use crate::domain::usage::{ClosedSessionUsage, UsageSummary, summarize_usage};

/// Live charging sessions. A consumer holds at most one active session; once
/// ended, a session is history and never changes again.
#[derive(Clone)]
pub struct SessionManager {
    store: Store,
    clock: Arc<dyn Clock>,
    sync_outlet_status: bool,
}

impl SessionManager {
    pub fn new(store: Store, clock: Arc<dyn Clock>, sync_outlet_status: bool) -> Self {
        Self {
            store,
            clock,
            sync_outlet_status,
        }
    }

    /// Repeating a start on the outlet the consumer is already charging at
    /// returns the existing session.
    pub fn start_session(
        &self,
        consumer_id: i64,
        station_id: i64,
        outlet_id: i64,
    ) -> Result<Session, ServiceError> {
        let result = self.store.write(|connection| {
            require_consumer(connection, consumer_id)?;
            require_station(connection, station_id)?;
            let outlet = require_outlet(connection, outlet_id)?;

            if let Some(active) = db::get_active_session_for_consumer(connection, consumer_id)? {
                if active.outlet_id == outlet_id && active.station_id == station_id {
                    return Ok((active, false));
                }
                return Err(ServiceError::conflict(format!(
                    "consumer {consumer_id} already has active session {} on outlet {}",
                    active.id, active.outlet_id
                )));
            }

            if outlet.station_id != Some(station_id) {
                return Err(ServiceError::invalid(format!(
                    "outlet {outlet_id} does not belong to station {station_id}"
                )));
            }

            if let Some(other) = db::get_active_session_for_outlet(connection, outlet_id)? {
                return Err(ServiceError::conflict(format!(
                    "outlet {outlet_id} is in use by session {}",
                    other.id
                )));
            }

            let id = db::insert_session(
                connection,
                &NewSession {
                    consumer_id,
                    station_id,
                    outlet_id,
                    start_time: self.clock.now().to_iso8601(),
                    cost_per_hour: outlet.cost_per_hour,
                    max_power_kw: outlet.max_power_kw,
                },
            )?;

            if self.sync_outlet_status {
                db::update_outlet_status(connection, outlet_id, ChargerStatus::Occupied)?;
            }

            Ok((require_session(connection, id)?, true))
        });

        match result {
            Ok((session, true)) => {
                tracing::info!(
                    session_id = session.id,
                    consumer_id,
                    station_id,
                    outlet_id,
                    start_time = %session.start_time,
                    "charging session started"
                );
                Ok(session)
            }
            Ok((session, false)) => {
                tracing::debug!(session_id = session.id, consumer_id, "session start repeated");
                Ok(session)
            }
            Err(error @ ServiceError::Conflict(_)) => {
                tracing::warn!(consumer_id, outlet_id, error = %error, "session start refused");
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Not idempotent: a session that is unknown or already closed is
    /// reported as not found.
    pub fn end_session(&self, session_id: i64) -> Result<Session, ServiceError> {
        let session = self.store.write(|connection| {
            let end_time = self.clock.now().to_iso8601();
            if db::close_session(connection, session_id, &end_time)? == 0 {
                return Err(ServiceError::not_found("active session", session_id));
            }

            let session = require_session(connection, session_id)?;
            if self.sync_outlet_status {
                db::release_outlet(connection, session.outlet_id)?;
            }
            Ok(session)
        })?;

        tracing::info!(
            session_id,
            consumer_id = session.consumer_id,
            outlet_id = session.outlet_id,
            end_time = session.end_time.as_deref().unwrap_or_default(),
            "charging session ended"
        );
        Ok(session)
    }

    pub fn get_active(&self, consumer_id: i64) -> Result<Option<Session>, ServiceError> {
        self.store
            .read(|connection| Ok(db::get_active_session_for_consumer(connection, consumer_id)?))
    }

    pub fn get_session(&self, session_id: i64) -> Result<Session, ServiceError> {
        self.store
            .read(|connection| require_session(connection, session_id))
    }

    /// Closed sessions, most recently ended first.
    pub fn list_history(&self, consumer_id: i64) -> Result<Vec<Session>, ServiceError> {
        self.store.read(|connection| {
            Ok(db::list_closed_sessions_by_consumer(
                connection,
                consumer_id,
            )?)
        })
    }

    pub fn usage_summary(&self, consumer_id: i64) -> Result<UsageSummary, ServiceError> {
        let rows = self.store.read(|connection| {
            require_consumer(connection, consumer_id)?;
            Ok(db::list_session_usage_by_consumer(connection, consumer_id)?)
        })?;

        let mut usage = Vec::with_capacity(rows.len());
        for row in rows {
            let started_at = TimestampMs::parse_rfc3339(&row.start_time)
                .map_err(|error| ServiceError::Unavailable(error.to_string()))?;
            let ended_at = TimestampMs::parse_rfc3339(&row.end_time)
                .map_err(|error| ServiceError::Unavailable(error.to_string()))?;
            usage.push(ClosedSessionUsage {
                started_at,
                ended_at,
                cost_per_hour: row.cost_per_hour,
                max_power_kw: row.max_power_kw,
            });
        }

        Ok(summarize_usage(&usage))
    }
}

fn require_session(connection: &rusqlite::Connection, id: i64) -> Result<Session, ServiceError> {
    db::get_session(connection, id)?.ok_or_else(|| ServiceError::not_found("session", id))
}
