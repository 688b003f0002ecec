use rusqlite::Connection;

use super::directory::require_operator;
use super::{ServiceError, Store};
use crate::adapters::db;
use crate::domain::geo::{Coordinates, distance_km};
use crate::domain::models::{ChargerStatus, Station};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub origin: Coordinates,
    pub radius_km: f64,
    pub available_only: bool,
}

#[derive(Clone)]
pub struct StationRegistry {
    store: Store,
}

impl StationRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create_station(
        &self,
        operator_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> Result<Station, ServiceError> {
        let coordinates = Coordinates {
            latitude,
            longitude,
        };
        if !coordinates.is_valid() {
            return Err(ServiceError::invalid(format!(
                "coordinates out of range: ({latitude}, {longitude})"
            )));
        }

        let station = self.store.write(|connection| {
            require_operator(connection, operator_id)?;
            let id = db::insert_station(
                connection,
                operator_id,
                latitude,
                longitude,
                ChargerStatus::Available,
            )?;
            require_station(connection, id)
        })?;

        tracing::info!(
            station_id = station.id,
            operator_id,
            latitude,
            longitude,
            "station created"
        );
        Ok(station)
    }

    pub fn set_status(&self, station_id: i64, status: ChargerStatus) -> Result<Station, ServiceError> {
        let station = self.store.write(|connection| {
            if db::update_station_status(connection, station_id, status)? == 0 {
                return Err(ServiceError::not_found("station", station_id));
            }
            require_station(connection, station_id)
        })?;

        tracing::info!(station_id, status = %status, "station status updated");
        Ok(station)
    }

    pub fn get_station(&self, station_id: i64) -> Result<Station, ServiceError> {
        self.store
            .read(|connection| require_station(connection, station_id))
    }

    /// Unknown operators simply own no stations.
    pub fn list_by_operator(&self, operator_id: i64) -> Result<Vec<Station>, ServiceError> {
        self.store
            .read(|connection| Ok(db::list_stations_by_operator(connection, operator_id)?))
    }

    pub fn list_available(&self) -> Result<Vec<Station>, ServiceError> {
        self.store.read(|connection| {
            Ok(db::list_stations(
                connection,
                Some(ChargerStatus::Available),
            )?)
        })
    }

    pub fn list_all(&self) -> Result<Vec<Station>, ServiceError> {
        self.store
            .read(|connection| Ok(db::list_stations(connection, None)?))
    }

    /// Stations within the radius, closest first.
    pub fn list_nearby(&self, query: NearbyQuery) -> Result<Vec<Station>, ServiceError> {
        if !query.origin.is_valid() {
            return Err(ServiceError::invalid("origin coordinates out of range"));
        }
        if !query.radius_km.is_finite() || query.radius_km < 0.0 {
            return Err(ServiceError::invalid("radius must be a non-negative number"));
        }

        let status = query.available_only.then_some(ChargerStatus::Available);
        let stations = self
            .store
            .read(|connection| Ok(db::list_stations(connection, status)?))?;

        let mut nearby: Vec<(f64, Station)> = stations
            .into_iter()
            .map(|station| {
                let distance = distance_km(
                    query.origin,
                    Coordinates {
                        latitude: station.latitude,
                        longitude: station.longitude,
                    },
                );
                (distance, station)
            })
            .filter(|(distance, _)| *distance <= query.radius_km)
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(nearby.into_iter().map(|(_, station)| station).collect())
    }

    /// Detaches every attached outlet (they stay in inventory), drops the
    /// station's ratings and removes the station. Refused while any attached
    /// outlet carries an active session.
    pub fn delete_station(&self, station_id: i64) -> Result<(), ServiceError> {
        let detached = self.store.write(|connection| {
            require_station(connection, station_id)?;

            if db::count_active_sessions_for_station(connection, station_id)? > 0 {
                return Err(ServiceError::conflict(format!(
                    "station {station_id} has an active charging session"
                )));
            }

            let detached = db::detach_outlets_of_station(connection, station_id)?;
            db::delete_ratings_of_station(connection, station_id)?;
            db::delete_station(connection, station_id)?;
            Ok(detached)
        });

        match detached {
            Ok(detached) => {
                tracing::info!(station_id, detached_outlets = detached, "station deleted");
                Ok(())
            }
            Err(error @ ServiceError::Conflict(_)) => {
                tracing::warn!(station_id, error = %error, "station deletion refused");
                Err(error)
            }
            Err(error) => Err(error),
        }
    }
}

pub(super) fn require_station(connection: &Connection, id: i64) -> Result<Station, ServiceError> {
    db::get_station(connection, id)?.ok_or_else(|| ServiceError::not_found("station", id))
}

#[cfg(test)]
mod tests {
    use super::NearbyQuery;
    use crate::app::services::{NewOutletRequest, ServiceError};
    use crate::domain::geo::Coordinates;
    use crate::domain::models::ChargerStatus;
    use crate::test_support::{register_consumer, register_operator, test_services};

    #[test]
    fn creates_available_station_for_known_operator() {
        let services = test_services("stations-create");
        let operator = register_operator(&services, "ops@example.com");

        let station = services
            .stations
            .create_station(operator.id, 40.64, -8.65)
            .expect("creation should succeed");

        assert_eq!(station.status, ChargerStatus::Available);
        assert_eq!(station.operator_id, operator.id);
        assert_eq!(station.latitude, 40.64);
    }

    #[test]
    fn rejects_unknown_operator_and_bad_coordinates() {
        let services = test_services("stations-create-invalid");

        assert_eq!(
            services.stations.create_station(42, 40.64, -8.65),
            Err(ServiceError::not_found("operator", 42))
        );

        let operator = register_operator(&services, "ops@example.com");
        let err = services
            .stations
            .create_station(operator.id, 120.0, -8.65)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[test]
    fn any_status_transition_is_allowed() {
        let services = test_services("stations-status");
        let operator = register_operator(&services, "ops@example.com");
        let station = services
            .stations
            .create_station(operator.id, 40.64, -8.65)
            .expect("creation should succeed");

        for status in [
            ChargerStatus::Maintenance,
            ChargerStatus::Offline,
            ChargerStatus::Occupied,
            ChargerStatus::Available,
        ] {
            let updated = services
                .stations
                .set_status(station.id, status)
                .expect("status update should succeed");
            assert_eq!(updated.status, status);
        }

        assert_eq!(
            services.stations.set_status(999, ChargerStatus::Offline),
            Err(ServiceError::not_found("station", 999))
        );
    }

    #[test]
    fn operator_and_consumer_views_differ() {
        let services = test_services("stations-views");
        let first = register_operator(&services, "one@example.com");
        let second = register_operator(&services, "two@example.com");

        let a = services.stations.create_station(first.id, 40.6, -8.6).expect("create");
        let b = services.stations.create_station(first.id, 40.7, -8.7).expect("create");
        let c = services.stations.create_station(second.id, 41.1, -8.6).expect("create");
        services
            .stations
            .set_status(b.id, ChargerStatus::Maintenance)
            .expect("status update");

        let owned: Vec<i64> = services
            .stations
            .list_by_operator(first.id)
            .expect("list")
            .iter()
            .map(|s| s.id)
            .collect();
        let available: Vec<i64> = services
            .stations
            .list_available()
            .expect("list")
            .iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(owned, vec![a.id, b.id]);
        assert_eq!(available, vec![a.id, c.id]);
        assert!(services.stations.list_by_operator(999).expect("list").is_empty());
    }

    #[test]
    fn nearby_search_filters_by_radius_and_status() {
        let services = test_services("stations-nearby");
        let operator = register_operator(&services, "ops@example.com");
        let aveiro = services
            .stations
            .create_station(operator.id, 40.6405, -8.6538)
            .expect("create");
        let ilhavo = services
            .stations
            .create_station(operator.id, 40.6000, -8.6667)
            .expect("create");
        services
            .stations
            .create_station(operator.id, 41.1579, -8.6291)
            .expect("create");
        services
            .stations
            .set_status(ilhavo.id, ChargerStatus::Offline)
            .expect("status update");

        let origin = Coordinates {
            latitude: 40.64,
            longitude: -8.65,
        };
        let all_nearby = services
            .stations
            .list_nearby(NearbyQuery {
                origin,
                radius_km: 10.0,
                available_only: false,
            })
            .expect("query");
        let available_nearby = services
            .stations
            .list_nearby(NearbyQuery {
                origin,
                radius_km: 10.0,
                available_only: true,
            })
            .expect("query");

        assert_eq!(
            all_nearby.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![aveiro.id, ilhavo.id]
        );
        assert_eq!(
            available_nearby.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![aveiro.id]
        );
    }

    #[test]
    fn delete_detaches_outlets_when_idle() {
        let services = test_services("stations-delete-idle");
        let operator = register_operator(&services, "ops@example.com");
        let station = services
            .stations
            .create_station(operator.id, 40.64, -8.65)
            .expect("create");
        let outlet = services
            .outlets
            .create_outlet(NewOutletRequest {
                station_id: Some(station.id),
                cost_per_hour: 2.5,
                max_power_kw: 22.0,
                status: None,
            })
            .expect("outlet create");

        services
            .stations
            .delete_station(station.id)
            .expect("deletion should succeed");

        assert_eq!(
            services.stations.get_station(station.id),
            Err(ServiceError::not_found("station", station.id))
        );
        let outlet = services.outlets.get_outlet(outlet.id).expect("outlet survives");
        assert_eq!(outlet.station_id, None);
        assert_eq!(
            services.stations.delete_station(station.id),
            Err(ServiceError::not_found("station", station.id))
        );
    }

    #[test]
    fn delete_is_refused_while_a_session_is_active() {
        let services = test_services("stations-delete-active");
        let operator = register_operator(&services, "ops@example.com");
        let consumer = register_consumer(&services, "ana@example.com");
        let station = services
            .stations
            .create_station(operator.id, 40.64, -8.65)
            .expect("create");
        let outlet = services
            .outlets
            .create_outlet(NewOutletRequest {
                station_id: Some(station.id),
                cost_per_hour: 2.5,
                max_power_kw: 22.0,
                status: None,
            })
            .expect("outlet create");
        let session = services
            .sessions
            .start_session(consumer.id, station.id, outlet.id)
            .expect("session start");

        let err = services.stations.delete_station(station.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(
            services.outlets.get_outlet(outlet.id).expect("outlet").station_id,
            Some(station.id)
        );

        services.sessions.end_session(session.id).expect("session end");
        services
            .stations
            .delete_station(station.id)
            .expect("deletion should succeed once idle");
    }
}
