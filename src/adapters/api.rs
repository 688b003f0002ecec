use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, Responder, delete, get, post, put, web};
use serde::{Deserialize, Serialize};

use crate::app::services::{
    NearbyQuery, NewConsumerRequest, NewOperatorRequest, NewOutletRequest, NewRatingRequest,
    NewReservationRequest, ServiceError, Services,
};
use crate::domain::geo::Coordinates;
use crate::domain::models::ChargerStatus;
use crate::domain::usage::UsageSummary;

const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

#[derive(Clone)]
pub struct ApiState {
    pub services: Services,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOperatorBody {
    pub email: String,
    pub password_hash: String,
    pub operator_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterConsumerBody {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBody {
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStationBody {
    pub operator_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationListQuery {
    pub operator_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: Option<f64>,
    pub available_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutletBody {
    pub station_id: Option<i64>,
    pub cost_per_hour: f64,
    pub max_power_kw: f64,
    pub status: Option<ChargerStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerQuery {
    pub consumer_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationBody {
    pub station_id: i64,
    pub outlet_id: i64,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionBody {
    pub consumer_id: i64,
    pub station_id: i64,
    pub outlet_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingBody {
    pub consumer_id: i64,
    pub station_id: i64,
    pub stars: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub consumer_id: i64,
    pub total_sessions: usize,
    pub total_hours: f64,
    pub estimated_energy_kwh: f64,
    pub estimated_cost: f64,
    pub co2_avoided_kg: f64,
    pub km_equivalent: f64,
}

impl UsageResponse {
    fn new(consumer_id: i64, summary: UsageSummary) -> Self {
        Self {
            consumer_id,
            total_sessions: summary.total_sessions,
            total_hours: summary.total_hours,
            estimated_energy_kwh: summary.estimated_energy_kwh,
            estimated_cost: summary.estimated_cost,
            co2_avoided_kg: summary.co2_avoided_kg,
            km_equivalent: summary.km_equivalent,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health)
        .service(register_operator_endpoint)
        .service(get_operator_endpoint)
        .service(update_operator_password_endpoint)
        .service(register_consumer_endpoint)
        .service(get_consumer_endpoint)
        .service(update_consumer_password_endpoint)
        .service(consumer_usage_endpoint)
        .service(create_station_endpoint)
        .service(list_stations_endpoint)
        .service(nearby_stations_endpoint)
        .service(get_station_endpoint)
        .service(set_station_status_endpoint)
        .service(delete_station_endpoint)
        .service(create_station_outlet_endpoint)
        .service(list_station_outlets_endpoint)
        .service(attach_outlet_endpoint)
        .service(remove_outlet_endpoint)
        .service(create_outlet_endpoint)
        .service(list_outlets_endpoint)
        .service(get_outlet_endpoint)
        .service(set_outlet_status_endpoint)
        .service(detach_outlet_endpoint)
        .service(delete_outlet_endpoint)
        .service(create_reservation_endpoint)
        .service(list_reservations_endpoint)
        .service(get_reservation_endpoint)
        .service(start_session_endpoint)
        .service(get_active_session_endpoint)
        .service(list_sessions_endpoint)
        .service(get_session_endpoint)
        .service(end_session_endpoint)
        .service(submit_rating_endpoint)
        .service(list_station_ratings_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// -- directory --

#[post("/operators")]
async fn register_operator_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<RegisterOperatorBody>,
) -> impl Responder {
    let body = body.into_inner();
    match state.services.directory.register_operator(NewOperatorRequest {
        email: body.email,
        password_hash: body.password_hash,
        operator_type: body.operator_type,
    }) {
        Ok(operator) => HttpResponse::Created().json(operator),
        Err(error) => service_error_response(error),
    }
}

#[get("/operators/{id}")]
async fn get_operator_endpoint(state: web::Data<ApiState>, path: web::Path<i64>) -> impl Responder {
    ok_json(state.services.directory.get_operator(path.into_inner()))
}

#[put("/operators/{id}/password")]
async fn update_operator_password_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
    body: web::Json<PasswordBody>,
) -> impl Responder {
    ok_json(
        state
            .services
            .directory
            .update_operator_password(path.into_inner(), &body.password_hash),
    )
}

#[post("/consumers")]
async fn register_consumer_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<RegisterConsumerBody>,
) -> impl Responder {
    let body = body.into_inner();
    match state.services.directory.register_consumer(NewConsumerRequest {
        email: body.email,
        password_hash: body.password_hash,
        name: body.name,
    }) {
        Ok(consumer) => HttpResponse::Created().json(consumer),
        Err(error) => service_error_response(error),
    }
}

#[get("/consumers/{id}")]
async fn get_consumer_endpoint(state: web::Data<ApiState>, path: web::Path<i64>) -> impl Responder {
    ok_json(state.services.directory.get_consumer(path.into_inner()))
}

#[put("/consumers/{id}/password")]
async fn update_consumer_password_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
    body: web::Json<PasswordBody>,
) -> impl Responder {
    ok_json(
        state
            .services
            .directory
            .update_consumer_password(path.into_inner(), &body.password_hash),
    )
}

#[get("/consumers/{id}/usage")]
async fn consumer_usage_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    let consumer_id = path.into_inner();
    match state.services.sessions.usage_summary(consumer_id) {
        Ok(summary) => HttpResponse::Ok().json(UsageResponse::new(consumer_id, summary)),
        Err(error) => service_error_response(error),
    }
}

// -- stations --

#[post("/stations")]
async fn create_station_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<CreateStationBody>,
) -> impl Responder {
    match state
        .services
        .stations
        .create_station(body.operator_id, body.latitude, body.longitude)
    {
        Ok(station) => HttpResponse::Created().json(station),
        Err(error) => service_error_response(error),
    }
}

/// Operator view with `operatorId`, otherwise the consumer view of available
/// stations.
#[get("/stations")]
async fn list_stations_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<StationListQuery>,
) -> impl Responder {
    match query.operator_id {
        Some(operator_id) => ok_json(state.services.stations.list_by_operator(operator_id)),
        None => ok_json(state.services.stations.list_available()),
    }
}

#[get("/stations/nearby")]
async fn nearby_stations_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<NearbyParams>,
) -> impl Responder {
    ok_json(state.services.stations.list_nearby(NearbyQuery {
        origin: Coordinates {
            latitude: query.lat,
            longitude: query.lon,
        },
        radius_km: query.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM),
        available_only: query.available_only.unwrap_or(false),
    }))
}

#[get("/stations/{id}")]
async fn get_station_endpoint(state: web::Data<ApiState>, path: web::Path<i64>) -> impl Responder {
    ok_json(state.services.stations.get_station(path.into_inner()))
}

#[put("/stations/{id}/status")]
async fn set_station_status_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
    query: web::Query<StatusQuery>,
) -> impl Responder {
    let status = match query.status.parse::<ChargerStatus>() {
        Ok(status) => status,
        Err(error) => return service_error_response(ServiceError::invalid(error)),
    };
    ok_json(state.services.stations.set_status(path.into_inner(), status))
}

#[delete("/stations/{id}")]
async fn delete_station_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    match state.services.stations.delete_station(path.into_inner()) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(error) => service_error_response(error),
    }
}

// -- outlets --

#[post("/stations/{id}/outlets")]
async fn create_station_outlet_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
    body: web::Json<CreateOutletBody>,
) -> impl Responder {
    let station_id = path.into_inner();
    if let Some(body_station) = body.station_id
        && body_station != station_id
    {
        return service_error_response(ServiceError::invalid(format!(
            "body stationId {body_station} does not match path station {station_id}"
        )));
    }

    create_outlet_response(&state, Some(station_id), &body)
}

#[get("/stations/{id}/outlets")]
async fn list_station_outlets_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    ok_json(state.services.outlets.list_by_station(path.into_inner()))
}

#[put("/stations/{id}/outlets/{outlet_id}/attach")]
async fn attach_outlet_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (station_id, outlet_id) = path.into_inner();
    ok_json(state.services.outlets.attach(outlet_id, station_id))
}

#[put("/stations/{id}/outlets/{outlet_id}/detach")]
async fn remove_outlet_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(i64, i64)>,
) -> impl Responder {
    let (station_id, outlet_id) = path.into_inner();
    ok_json(state.services.outlets.remove_outlet(station_id, outlet_id))
}

#[post("/outlets")]
async fn create_outlet_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<CreateOutletBody>,
) -> impl Responder {
    create_outlet_response(&state, body.station_id, &body)
}

#[get("/outlets")]
async fn list_outlets_endpoint(state: web::Data<ApiState>) -> impl Responder {
    ok_json(state.services.outlets.list_all())
}

#[get("/outlets/{id}")]
async fn get_outlet_endpoint(state: web::Data<ApiState>, path: web::Path<i64>) -> impl Responder {
    ok_json(state.services.outlets.get_outlet(path.into_inner()))
}

#[put("/outlets/{id}/status")]
async fn set_outlet_status_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
    query: web::Query<StatusQuery>,
) -> impl Responder {
    let status = match query.status.parse::<ChargerStatus>() {
        Ok(status) => status,
        Err(error) => return service_error_response(ServiceError::invalid(error)),
    };
    ok_json(state.services.outlets.set_status(path.into_inner(), status))
}

#[put("/outlets/{id}/detach")]
async fn detach_outlet_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    ok_json(state.services.outlets.detach(path.into_inner()))
}

#[delete("/outlets/{id}")]
async fn delete_outlet_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    match state.services.outlets.delete_outlet(path.into_inner()) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(error) => service_error_response(error),
    }
}

fn create_outlet_response(
    state: &ApiState,
    station_id: Option<i64>,
    body: &CreateOutletBody,
) -> HttpResponse {
    match state.services.outlets.create_outlet(NewOutletRequest {
        station_id,
        cost_per_hour: body.cost_per_hour,
        max_power_kw: body.max_power_kw,
        status: body.status,
    }) {
        Ok(outlet) => HttpResponse::Created().json(outlet),
        Err(error) => service_error_response(error),
    }
}

// -- reservations --

#[post("/reservations")]
async fn create_reservation_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<ConsumerQuery>,
    body: web::Json<CreateReservationBody>,
) -> impl Responder {
    let body = body.into_inner();
    match state
        .services
        .reservations
        .create_reservation(NewReservationRequest {
            consumer_id: query.consumer_id,
            station_id: body.station_id,
            outlet_id: body.outlet_id,
            start_time: body.start_time,
            end_time: body.end_time,
        }) {
        Ok(reservation) => HttpResponse::Created().json(reservation),
        Err(error) => service_error_response(error),
    }
}

#[get("/reservations")]
async fn list_reservations_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<ConsumerQuery>,
) -> impl Responder {
    ok_json(
        state
            .services
            .reservations
            .list_by_consumer(query.consumer_id),
    )
}

#[get("/reservations/{id}")]
async fn get_reservation_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    ok_json(state.services.reservations.get_reservation(path.into_inner()))
}

// -- sessions --

#[post("/sessions")]
async fn start_session_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<StartSessionBody>,
) -> impl Responder {
    match state
        .services
        .sessions
        .start_session(body.consumer_id, body.station_id, body.outlet_id)
    {
        Ok(session) => HttpResponse::Created().json(session),
        Err(error) => service_error_response(error),
    }
}

#[get("/sessions/active/{consumer_id}")]
async fn get_active_session_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    match state.services.sessions.get_active(path.into_inner()) {
        Ok(Some(session)) => HttpResponse::Ok().json(session),
        Ok(None) => HttpResponse::NoContent().finish(),
        Err(error) => service_error_response(error),
    }
}

#[get("/sessions")]
async fn list_sessions_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<ConsumerQuery>,
) -> impl Responder {
    ok_json(state.services.sessions.list_history(query.consumer_id))
}

#[get("/sessions/{id}")]
async fn get_session_endpoint(state: web::Data<ApiState>, path: web::Path<i64>) -> impl Responder {
    ok_json(state.services.sessions.get_session(path.into_inner()))
}

#[delete("/sessions/{id}")]
async fn end_session_endpoint(state: web::Data<ApiState>, path: web::Path<i64>) -> impl Responder {
    match state.services.sessions.end_session(path.into_inner()) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(error) => service_error_response(error),
    }
}

// -- ratings --

#[post("/ratings")]
async fn submit_rating_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<SubmitRatingBody>,
) -> impl Responder {
    let body = body.into_inner();
    match state.services.ratings.submit_rating(NewRatingRequest {
        consumer_id: body.consumer_id,
        station_id: body.station_id,
        stars: body.stars,
        comment: body.comment,
    }) {
        Ok(rating) => HttpResponse::Created().json(rating),
        Err(error) => service_error_response(error),
    }
}

#[get("/stations/{id}/ratings")]
async fn list_station_ratings_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<i64>,
) -> impl Responder {
    ok_json(state.services.ratings.list_by_station(path.into_inner()))
}

fn ok_json<T: Serialize>(result: Result<T, ServiceError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(error) => service_error_response(error),
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    let body = serde_json::json!({ "error": error.to_string() });
    match error {
        ServiceError::NotFound { .. } => HttpResponse::NotFound().json(body),
        ServiceError::InvalidArgument(_) => HttpResponse::BadRequest().json(body),
        ServiceError::Conflict(_) => HttpResponse::Conflict().json(body),
        ServiceError::Unavailable(_) => {
            tracing::error!(error = %error, "request failed on unavailable storage");
            HttpResponse::ServiceUnavailable().json(body)
        }
    }
}

fn json_error_handler(error: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = service_error_response(ServiceError::invalid(format!(
        "malformed request body: {error}"
    )));
    actix_web::error::InternalError::from_response(error, response).into()
}

fn query_error_handler(error: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = service_error_response(ServiceError::invalid(format!(
        "malformed query string: {error}"
    )));
    actix_web::error::InternalError::from_response(error, response).into()
}
