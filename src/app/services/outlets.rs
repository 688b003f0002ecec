use rusqlite::Connection;

use super::stations::require_station;
use super::{ServiceError, Store};
use crate::adapters::db::{self, NewOutlet};
use crate::domain::models::{ChargerStatus, Outlet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewOutletRequest {
    pub station_id: Option<i64>,
    pub cost_per_hour: f64,
    pub max_power_kw: f64,
    pub status: Option<ChargerStatus>,
}

#[derive(Clone)]
pub struct OutletRegistry {
    store: Store,
}

impl OutletRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create_outlet(&self, request: NewOutletRequest) -> Result<Outlet, ServiceError> {
        if !request.cost_per_hour.is_finite() || request.cost_per_hour < 0.0 {
            return Err(ServiceError::invalid(format!(
                "cost per hour must be >= 0, got {}",
                request.cost_per_hour
            )));
        }
        if !request.max_power_kw.is_finite() || request.max_power_kw <= 0.0 {
            return Err(ServiceError::invalid(format!(
                "max power must be > 0 kW, got {}",
                request.max_power_kw
            )));
        }

        let outlet = self.store.write(|connection| {
            if let Some(station_id) = request.station_id {
                require_station(connection, station_id)?;
            }

            let id = db::insert_outlet(
                connection,
                &NewOutlet {
                    station_id: request.station_id,
                    status: request.status.unwrap_or(ChargerStatus::Available),
                    cost_per_hour: request.cost_per_hour,
                    max_power_kw: request.max_power_kw,
                },
            )?;
            require_outlet(connection, id)
        })?;

        tracing::info!(
            outlet_id = outlet.id,
            station_id = ?outlet.station_id,
            cost_per_hour = outlet.cost_per_hour,
            max_power_kw = outlet.max_power_kw,
            "outlet created"
        );
        Ok(outlet)
    }

    pub fn get_outlet(&self, outlet_id: i64) -> Result<Outlet, ServiceError> {
        self.store.read(|connection| require_outlet(connection, outlet_id))
    }

    /// Re-attaching to the current station is a no-op. Moving an outlet is
    /// refused while it carries an active session started at another station.
    pub fn attach(&self, outlet_id: i64, station_id: i64) -> Result<Outlet, ServiceError> {
        let result = self.store.write(|connection| {
            let outlet = require_outlet(connection, outlet_id)?;
            require_station(connection, station_id)?;

            if let Some(session) = db::get_active_session_for_outlet(connection, outlet_id)?
                && session.station_id != station_id
            {
                return Err(ServiceError::conflict(format!(
                    "outlet {outlet_id} has active session {} at station {}",
                    session.id, session.station_id
                )));
            }

            if outlet.station_id == Some(station_id) {
                return Ok(outlet);
            }

            db::update_outlet_station(connection, outlet_id, Some(station_id))?;
            require_outlet(connection, outlet_id)
        });

        match result {
            Ok(outlet) => {
                tracing::info!(outlet_id, station_id, "outlet attached");
                Ok(outlet)
            }
            Err(error @ ServiceError::Conflict(_)) => {
                tracing::warn!(outlet_id, station_id, error = %error, "outlet attach refused");
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    pub fn detach(&self, outlet_id: i64) -> Result<Outlet, ServiceError> {
        let outlet = self.store.write(|connection| {
            let outlet = require_outlet(connection, outlet_id)?;
            if outlet.station_id.is_none() {
                return Ok(outlet);
            }

            db::update_outlet_station(connection, outlet_id, None)?;
            require_outlet(connection, outlet_id)
        })?;

        tracing::info!(outlet_id, "outlet detached");
        Ok(outlet)
    }

    /// Detaches the outlet from this particular station, keeping the record
    /// for reuse.
    pub fn remove_outlet(&self, station_id: i64, outlet_id: i64) -> Result<Outlet, ServiceError> {
        let outlet = self.store.write(|connection| {
            require_station(connection, station_id)?;
            let outlet = require_outlet(connection, outlet_id)?;

            match outlet.station_id {
                None => Ok(outlet),
                Some(current) if current == station_id => {
                    db::update_outlet_station(connection, outlet_id, None)?;
                    require_outlet(connection, outlet_id)
                }
                Some(current) => Err(ServiceError::conflict(format!(
                    "outlet {outlet_id} is attached to station {current}, not {station_id}"
                ))),
            }
        })?;

        tracing::info!(outlet_id, station_id, "outlet removed from station");
        Ok(outlet)
    }

    pub fn set_status(&self, outlet_id: i64, status: ChargerStatus) -> Result<Outlet, ServiceError> {
        let outlet = self.store.write(|connection| {
            if db::update_outlet_status(connection, outlet_id, status)? == 0 {
                return Err(ServiceError::not_found("outlet", outlet_id));
            }
            require_outlet(connection, outlet_id)
        })?;

        tracing::info!(outlet_id, status = %status, "outlet status updated");
        Ok(outlet)
    }

    pub fn delete_outlet(&self, outlet_id: i64) -> Result<(), ServiceError> {
        self.store.write(|connection| {
            require_outlet(connection, outlet_id)?;
            if let Some(session) = db::get_active_session_for_outlet(connection, outlet_id)? {
                return Err(ServiceError::conflict(format!(
                    "outlet {outlet_id} has active session {}",
                    session.id
                )));
            }
            db::delete_outlet(connection, outlet_id)?;
            Ok(())
        })?;

        tracing::info!(outlet_id, "outlet deleted");
        Ok(())
    }

    pub fn list_by_station(&self, station_id: i64) -> Result<Vec<Outlet>, ServiceError> {
        self.store.read(|connection| {
            require_station(connection, station_id)?;
            Ok(db::list_outlets_by_station(connection, station_id)?)
        })
    }

    pub fn list_all(&self) -> Result<Vec<Outlet>, ServiceError> {
        self.store.read(|connection| Ok(db::list_outlets(connection)?))
    }
}

pub(super) fn require_outlet(connection: &Connection, id: i64) -> Result<Outlet, ServiceError> {
    db::get_outlet(connection, id)?.ok_or_else(|| ServiceError::not_found("outlet", id))
}

#[cfg(test)]
mod tests {
    use super::NewOutletRequest;
    use crate::app::services::{ServiceError, Services};
    use crate::domain::models::{ChargerStatus, Station};
    use crate::test_support::{register_consumer, register_operator, test_services};

    fn two_stations(services: &Services) -> (Station, Station) {
        let operator = register_operator(services, "ops@example.com");
        let first = services
            .stations
            .create_station(operator.id, 40.64, -8.65)
            .expect("create");
        let second = services
            .stations
            .create_station(operator.id, 40.60, -8.66)
            .expect("create");
        (first, second)
    }

    fn outlet_at(station_id: Option<i64>) -> NewOutletRequest {
        NewOutletRequest {
            station_id,
            cost_per_hour: 2.5,
            max_power_kw: 22.0,
            status: None,
        }
    }

    #[test]
    fn validates_cost_and_power() {
        let services = test_services("outlets-validate");

        for (cost, power) in [(-0.01, 22.0), (2.5, 0.0), (2.5, -7.0), (f64::NAN, 22.0)] {
            let err = services
                .outlets
                .create_outlet(NewOutletRequest {
                    station_id: None,
                    cost_per_hour: cost,
                    max_power_kw: power,
                    status: None,
                })
                .unwrap_err();
            assert!(
                matches!(err, ServiceError::InvalidArgument(_)),
                "cost={cost} power={power}"
            );
        }

        let free = services
            .outlets
            .create_outlet(NewOutletRequest {
                station_id: None,
                cost_per_hour: 0.0,
                max_power_kw: 3.7,
                status: Some(ChargerStatus::Maintenance),
            })
            .expect("zero cost is allowed");
        assert_eq!(free.status, ChargerStatus::Maintenance);
        assert_eq!(free.station_id, None);
    }

    #[test]
    fn create_on_unknown_station_is_not_found() {
        let services = test_services("outlets-unknown-station");
        assert_eq!(
            services.outlets.create_outlet(outlet_at(Some(5))),
            Err(ServiceError::not_found("station", 5))
        );
    }

    #[test]
    fn attach_and_detach_are_idempotent() {
        let services = test_services("outlets-attach");
        let (station, _) = two_stations(&services);
        let outlet = services.outlets.create_outlet(outlet_at(None)).expect("create");

        let attached = services.outlets.attach(outlet.id, station.id).expect("attach");
        let again = services.outlets.attach(outlet.id, station.id).expect("attach again");
        assert_eq!(attached.station_id, Some(station.id));
        assert_eq!(attached, again);

        let listed = services.outlets.list_by_station(station.id).expect("list");
        assert_eq!(listed, vec![attached.clone()]);

        let detached = services.outlets.detach(outlet.id).expect("detach");
        let again = services.outlets.detach(outlet.id).expect("detach again");
        assert_eq!(detached.station_id, None);
        assert_eq!(detached, again);
        assert_eq!(detached.id, outlet.id);
    }

    #[test]
    fn attach_elsewhere_conflicts_with_active_session() {
        let services = test_services("outlets-attach-conflict");
        let (first, second) = two_stations(&services);
        let consumer = register_consumer(&services, "ana@example.com");
        let outlet = services
            .outlets
            .create_outlet(outlet_at(Some(first.id)))
            .expect("create");
        services
            .sessions
            .start_session(consumer.id, first.id, outlet.id)
            .expect("start");

        let err = services.outlets.attach(outlet.id, second.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        services
            .outlets
            .attach(outlet.id, first.id)
            .expect("same station stays allowed");
    }

    #[test]
    fn remove_keeps_outlet_in_inventory() {
        let services = test_services("outlets-remove");
        let (first, second) = two_stations(&services);
        let outlet = services
            .outlets
            .create_outlet(outlet_at(Some(first.id)))
            .expect("create");

        let err = services.outlets.remove_outlet(second.id, outlet.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let removed = services
            .outlets
            .remove_outlet(first.id, outlet.id)
            .expect("remove");
        assert_eq!(removed.station_id, None);
        assert!(services.outlets.list_by_station(first.id).expect("list").is_empty());
        assert_eq!(services.outlets.list_all().expect("list all"), vec![removed]);
    }

    #[test]
    fn delete_refused_during_active_session() {
        let services = test_services("outlets-delete");
        let (station, _) = two_stations(&services);
        let consumer = register_consumer(&services, "ana@example.com");
        let outlet = services
            .outlets
            .create_outlet(outlet_at(Some(station.id)))
            .expect("create");
        let session = services
            .sessions
            .start_session(consumer.id, station.id, outlet.id)
            .expect("start");

        assert!(matches!(
            services.outlets.delete_outlet(outlet.id),
            Err(ServiceError::Conflict(_))
        ));

        services.sessions.end_session(session.id).expect("end");
        services.outlets.delete_outlet(outlet.id).expect("delete");
        assert_eq!(
            services.outlets.get_outlet(outlet.id),
            Err(ServiceError::not_found("outlet", outlet.id))
        );
    }

    #[test]
    fn status_is_settable_independently() {
        let services = test_services("outlets-status");
        let outlet = services.outlets.create_outlet(outlet_at(None)).expect("create");

        let updated = services
            .outlets
            .set_status(outlet.id, ChargerStatus::Offline)
            .expect("update");
        assert_eq!(updated.status, ChargerStatus::Offline);
        assert_eq!(
            services.outlets.set_status(77, ChargerStatus::Offline),
            Err(ServiceError::not_found("outlet", 77))
        );
    }
}
