use super::directory::require_consumer;
use super::outlets::require_outlet;
use super::stations::require_station;
use super::{ServiceError, Store};
use crate::adapters::db::{self, NewReservation};
use crate::domain::clock::TimestampMs;
use crate::domain::models::Reservation;

#[derive(Debug, Clone, PartialEq)]
pub struct NewReservationRequest {
    pub consumer_id: i64,
    pub station_id: i64,
    pub outlet_id: i64,
    pub start_time: String,
    pub end_time: String,
}

/// Advisory bookings. A reservation never changes outlet status and is never
/// consulted when a session starts.
#[derive(Clone)]
pub struct ReservationScheduler {
    store: Store,
    reject_overlaps: bool,
}

impl ReservationScheduler {
    pub fn new(store: Store, reject_overlaps: bool) -> Self {
        Self {
            store,
            reject_overlaps,
        }
    }

    pub fn create_reservation(
        &self,
        request: NewReservationRequest,
    ) -> Result<Reservation, ServiceError> {
        let start = TimestampMs::parse_rfc3339(&request.start_time).map_err(ServiceError::invalid)?;
        let end = TimestampMs::parse_rfc3339(&request.end_time).map_err(ServiceError::invalid)?;
        if end <= start {
            return Err(ServiceError::invalid("reservation end must be after its start"));
        }

        let new_reservation = NewReservation {
            consumer_id: request.consumer_id,
            station_id: request.station_id,
            outlet_id: request.outlet_id,
            start_time: start.to_iso8601(),
            end_time: end.to_iso8601(),
        };

        let result = self.store.write(|connection| {
            require_consumer(connection, new_reservation.consumer_id)?;
            require_station(connection, new_reservation.station_id)?;
            let outlet = require_outlet(connection, new_reservation.outlet_id)?;

            if outlet.station_id != Some(new_reservation.station_id) {
                return Err(ServiceError::invalid(format!(
                    "outlet {} does not belong to station {}",
                    outlet.id, new_reservation.station_id
                )));
            }

            if self.reject_overlaps
                && db::count_overlapping_reservations(
                    connection,
                    outlet.id,
                    &new_reservation.start_time,
                    &new_reservation.end_time,
                )? > 0
            {
                return Err(ServiceError::conflict(format!(
                    "outlet {} is already reserved between {} and {}",
                    outlet.id, new_reservation.start_time, new_reservation.end_time
                )));
            }

            let id = db::insert_reservation(connection, &new_reservation)?;
            require_reservation(connection, id)
        });

        match result {
            Ok(reservation) => {
                tracing::info!(
                    reservation_id = reservation.id,
                    consumer_id = reservation.consumer_id,
                    outlet_id = reservation.outlet_id,
                    start_time = %reservation.start_time,
                    end_time = %reservation.end_time,
                    "reservation created"
                );
                Ok(reservation)
            }
            Err(error @ ServiceError::Conflict(_)) => {
                tracing::warn!(
                    consumer_id = new_reservation.consumer_id,
                    outlet_id = new_reservation.outlet_id,
                    error = %error,
                    "reservation rejected"
                );
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    pub fn get_reservation(&self, reservation_id: i64) -> Result<Reservation, ServiceError> {
        self.store
            .read(|connection| require_reservation(connection, reservation_id))
    }

    /// Ordered by start time, earliest first.
    pub fn list_by_consumer(&self, consumer_id: i64) -> Result<Vec<Reservation>, ServiceError> {
        self.store
            .read(|connection| Ok(db::list_reservations_by_consumer(connection, consumer_id)?))
    }
}

fn require_reservation(
    connection: &rusqlite::Connection,
    id: i64,
) -> Result<Reservation, ServiceError> {
    db::get_reservation(connection, id)?.ok_or_else(|| ServiceError::not_found("reservation", id))
}

#[cfg(test)]
mod tests {
    use super::NewReservationRequest;
    use crate::app::services::{NewOutletRequest, ServiceError, ServiceOptions, Services};
    use crate::domain::models::{ChargerStatus, Outlet, Station};
    use crate::test_support::{
        register_consumer, register_operator, test_services, test_services_with_options,
    };

    struct Fixture {
        services: Services,
        consumer_id: i64,
        station: Station,
        outlet: Outlet,
    }

    fn fixture(services: Services) -> Fixture {
        let operator = register_operator(&services, "ops@example.com");
        let consumer = register_consumer(&services, "ana@example.com");
        let station = services
            .stations
            .create_station(operator.id, 40.64, -8.65)
            .expect("create station");
        let outlet = services
            .outlets
            .create_outlet(NewOutletRequest {
                station_id: Some(station.id),
                cost_per_hour: 2.5,
                max_power_kw: 22.0,
                status: None,
            })
            .expect("create outlet");

        Fixture {
            services,
            consumer_id: consumer.id,
            station,
            outlet,
        }
    }

    fn request(fx: &Fixture, start: &str, end: &str) -> NewReservationRequest {
        NewReservationRequest {
            consumer_id: fx.consumer_id,
            station_id: fx.station.id,
            outlet_id: fx.outlet.id,
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn creates_reservation_with_normalized_times() {
        let fx = fixture(test_services("reservations-create"));

        let reservation = fx
            .services
            .reservations
            .create_reservation(request(
                &fx,
                "2026-03-01T10:00:00Z",
                "2026-03-01T12:30:00+01:00",
            ))
            .expect("creation should succeed");

        assert_eq!(reservation.start_time, "2026-03-01T10:00:00.000Z");
        assert_eq!(reservation.end_time, "2026-03-01T11:30:00.000Z");
        assert_eq!(
            fx.services.reservations.get_reservation(reservation.id),
            Ok(reservation)
        );
        assert_eq!(
            fx.services.outlets.get_outlet(fx.outlet.id).expect("outlet").status,
            ChargerStatus::Available
        );
    }

    #[test]
    fn rejects_empty_or_inverted_window() {
        let fx = fixture(test_services("reservations-window"));

        for (start, end) in [
            ("2026-03-01T10:00:00Z", "2026-03-01T10:00:00Z"),
            ("2026-03-01T11:00:00Z", "2026-03-01T10:00:00Z"),
            ("tomorrow", "2026-03-01T10:00:00Z"),
        ] {
            let err = fx
                .services
                .reservations
                .create_reservation(request(&fx, start, end))
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument(_)), "{start}..{end}");
        }
    }

    #[test]
    fn rejects_outlet_from_another_station() {
        let fx = fixture(test_services("reservations-mismatch"));
        let stray = fx
            .services
            .outlets
            .create_outlet(NewOutletRequest {
                station_id: None,
                cost_per_hour: 1.0,
                max_power_kw: 7.4,
                status: None,
            })
            .expect("create outlet");

        let mut req = request(&fx, "2026-03-01T10:00:00Z", "2026-03-01T11:00:00Z");
        req.outlet_id = stray.id;

        let err = fx.services.reservations.create_reservation(req).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_references_are_not_found() {
        let fx = fixture(test_services("reservations-unknown"));

        let mut req = request(&fx, "2026-03-01T10:00:00Z", "2026-03-01T11:00:00Z");
        req.consumer_id = 404;
        assert_eq!(
            fx.services.reservations.create_reservation(req),
            Err(ServiceError::not_found("consumer", 404))
        );

        let mut req = request(&fx, "2026-03-01T10:00:00Z", "2026-03-01T11:00:00Z");
        req.outlet_id = 404;
        assert_eq!(
            fx.services.reservations.create_reservation(req),
            Err(ServiceError::not_found("outlet", 404))
        );
    }

    #[test]
    fn overlapping_windows_are_rejected_by_default() {
        let fx = fixture(test_services("reservations-overlap"));
        fx.services
            .reservations
            .create_reservation(request(&fx, "2026-03-01T10:00:00Z", "2026-03-01T11:00:00Z"))
            .expect("first reservation");

        let err = fx
            .services
            .reservations
            .create_reservation(request(&fx, "2026-03-01T10:30:00Z", "2026-03-01T11:30:00Z"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        fx.services
            .reservations
            .create_reservation(request(&fx, "2026-03-01T11:00:00Z", "2026-03-01T12:00:00Z"))
            .expect("back-to-back window is fine");
    }

    #[test]
    fn overlapping_windows_allowed_when_configured() {
        let fx = fixture(test_services_with_options(
            "reservations-overlap-allowed",
            ServiceOptions {
                reject_overlapping_reservations: false,
                ..ServiceOptions::default()
            },
        ));

        for _ in 0..2 {
            fx.services
                .reservations
                .create_reservation(request(
                    &fx,
                    "2026-03-01T10:00:00Z",
                    "2026-03-01T11:00:00Z",
                ))
                .expect("overlap tolerated");
        }

        assert_eq!(
            fx.services
                .reservations
                .list_by_consumer(fx.consumer_id)
                .expect("list")
                .len(),
            2
        );
    }

    #[test]
    fn lists_consumer_reservations_in_start_order() {
        let fx = fixture(test_services("reservations-list"));
        for (start, end) in [
            ("2026-03-05T10:00:00Z", "2026-03-05T11:00:00Z"),
            ("2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z"),
        ] {
            fx.services
                .reservations
                .create_reservation(request(&fx, start, end))
                .expect("create");
        }

        let starts: Vec<String> = fx
            .services
            .reservations
            .list_by_consumer(fx.consumer_id)
            .expect("list")
            .into_iter()
            .map(|r| r.start_time)
            .collect();
        assert_eq!(
            starts,
            vec!["2026-03-02T10:00:00.000Z", "2026-03-05T10:00:00.000Z"]
        );
        assert!(
            fx.services
                .reservations
                .list_by_consumer(999)
                .expect("list")
                .is_empty()
        );
    }
}
