use std::sync::{Arc, Mutex};

use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;

use crate::adapters::db::DbError;
use crate::domain::clock::Clock;

mod directory;
mod outlets;
mod ratings;
mod reservations;
mod sessions;
mod stations;

pub use directory::{Directory, NewConsumerRequest, NewOperatorRequest};
pub use outlets::{NewOutletRequest, OutletRegistry};
pub use ratings::{NewRatingRequest, RatingRegistry};
pub use reservations::{NewReservationRequest, ReservationScheduler};
pub use sessions::SessionManager;
pub use stations::{NearbyQuery, StationRegistry};

#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn invalid<E: std::fmt::Display>(message: E) -> Self {
        Self::InvalidArgument(message.to_string())
    }

    pub(crate) fn conflict<E: std::fmt::Display>(message: E) -> Self {
        Self::Conflict(message.to_string())
    }
}

impl From<DbError> for ServiceError {
    fn from(error: DbError) -> Self {
        Self::Unavailable(error.to_string())
    }
}

/// Shared handle to the single SQLite connection.
///
/// Writers run their whole read-check-write sequence inside one IMMEDIATE
/// transaction while holding the connection mutex, so no two mutations ever
/// interleave.
#[derive(Clone)]
pub struct Store {
    connection: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    pub(crate) fn read<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::Unavailable("database lock poisoned".to_string()))?;
        op(&connection)
    }

    pub(crate) fn write<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::Unavailable("database lock poisoned".to_string()))?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;

        // dropping the transaction on error rolls it back
        let value = op(&*transaction)?;
        transaction.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub reject_overlapping_reservations: bool,
    pub sync_outlet_status: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            reject_overlapping_reservations: true,
            sync_outlet_status: false,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub directory: Directory,
    pub stations: StationRegistry,
    pub outlets: OutletRegistry,
    pub reservations: ReservationScheduler,
    pub sessions: SessionManager,
    pub ratings: RatingRegistry,
}

impl Services {
    pub fn new(store: Store, clock: Arc<dyn Clock>, options: ServiceOptions) -> Self {
        Self {
            directory: Directory::new(store.clone()),
            stations: StationRegistry::new(store.clone()),
            outlets: OutletRegistry::new(store.clone()),
            reservations: ReservationScheduler::new(
                store.clone(),
                options.reject_overlapping_reservations,
            ),
            sessions: SessionManager::new(store.clone(), clock, options.sync_outlet_status),
            ratings: RatingRegistry::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::adapters::db::DbError;

    #[test]
    fn renders_not_found_with_entity_and_id() {
        assert_eq!(
            ServiceError::not_found("station", 4).to_string(),
            "station 4 not found"
        );
    }

    #[test]
    fn storage_errors_become_unavailable() {
        let err = ServiceError::from(DbError::UnsupportedSchemaVersion {
            current: 9,
            latest: 2,
        });
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }
}
