use crate::app::AppError;
use crate::app::services::ServiceOptions;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub http_bind: String,
    pub cors_allowed_origin: String,
    pub reject_overlapping_reservations: bool,
    pub sync_outlet_status: bool,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            db_path: string_or_default(&lookup, "DB_PATH", "./data/evsync.db"),
            http_bind: string_or_default(&lookup, "HTTP_BIND", "0.0.0.0:8080"),
            cors_allowed_origin: string_or_default(
                &lookup,
                "CORS_ALLOWED_ORIGIN",
                "http://localhost:3000",
            ),
            reject_overlapping_reservations: bool_or_default(
                &lookup,
                "REJECT_OVERLAPPING_RESERVATIONS",
                true,
            )?,
            sync_outlet_status: bool_or_default(&lookup, "SYNC_OUTLET_STATUS", false)?,
            log_filter: string_or_default(&lookup, "LOG_FILTER", "info,actix_server=warn"),
        })
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            reject_overlapping_reservations: self.reject_overlapping_reservations,
            sync_outlet_status: self.sync_outlet_status,
        }
    }
}

fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn bool_or_default<F>(lookup: &F, key: &str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::config(format!("{key} must be a boolean"))),
        },
        None => Ok(default),
    }
}
