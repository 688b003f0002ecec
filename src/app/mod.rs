mod config;
mod error;
mod logging;
mod runtime;
pub mod services;

pub use config::AppConfig;
pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    // a missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;

    logging::init(&config.log_filter)?;

    tracing::info!(
        db_path = %config.db_path,
        http_bind = %config.http_bind,
        cors_allowed_origin = %config.cors_allowed_origin,
        reject_overlapping_reservations = config.reject_overlapping_reservations,
        sync_outlet_status = config.sync_outlet_status,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
