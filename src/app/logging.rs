use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

/// `RUST_LOG` wins over the configured filter when both are present.
pub fn init(default_filter: &str) -> Result<(), AppError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_filter)?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(AppError::logging_init)
}

fn build_filter(from_env: Option<&str>, default_filter: &str) -> Result<EnvFilter, AppError> {
    match from_env.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).map_err(AppError::logging_init),
        None => EnvFilter::try_new(default_filter).map_err(AppError::logging_init),
    }
}
