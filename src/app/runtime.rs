use std::path::Path;
use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use rusqlite::Connection;

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::db::{open_connection, run_migrations, schema_version};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::{Services, Store};
use crate::domain::clock::SystemClock;

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let connection = prepare_database(&config.db_path)?;
    let store = Store::new(Arc::new(Mutex::new(connection)));
    let api_state = ApiState {
        services: Services::new(store, Arc::new(SystemClock), config.service_options()),
    };
    let allowed_origin = config.cors_allowed_origin.clone();

    tracing::info!(bind = %config.http_bind, "http server starting");

    actix_web::rt::System::new()
        .block_on(async move {
            HttpServer::new(move || {
                let cors = Cors::default()
                    .allowed_origin(&allowed_origin)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allow_any_header()
                    .max_age(3600);

                App::new()
                    .wrap(cors)
                    .app_data(web::Data::new(api_state.clone()))
                    .configure(configure_routes)
            })
            .bind(&config.http_bind)?
            .run()
            .await
        })
        .map_err(AppError::Server)
}

fn prepare_database(db_path: &str) -> Result<Connection, AppError> {
    if let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| AppError::DataDir {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let mut connection = open_connection(db_path)?;
    run_migrations(&mut connection)?;
    let version = schema_version(&connection)?;
    tracing::info!(db_path = %db_path, schema_version = version, "database ready");

    Ok(connection)
}
