use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::adapters::db::{LATEST_SCHEMA_VERSION, open_connection, run_migrations};
use crate::app::services::{
    NewConsumerRequest, NewOperatorRequest, ServiceOptions, Services, Store,
};
use crate::domain::clock::{Clock, SystemClock, TimestampMs};
use crate::domain::models::{Consumer, Operator};

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampMs {
        TimestampMs(self.now.load(Ordering::SeqCst))
    }
}

/// Each test gets its own copy of an empty, fully migrated database.
fn test_store(test_name: &str) -> Store {
    static NEXT_DB: AtomicU64 = AtomicU64::new(0);

    let path = test_db_dir().join(format!(
        "{test_name}-{}-{}.sqlite",
        std::process::id(),
        NEXT_DB.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::copy(migrated_template(), &path).expect("template db should be copied");
    let connection = open_connection(path.to_string_lossy().as_ref()).expect("test db should open");

    Store::new(Arc::new(Mutex::new(connection)))
}

pub fn test_services(test_name: &str) -> Services {
    test_services_with_options(test_name, ServiceOptions::default())
}

pub fn test_services_with_options(test_name: &str, options: ServiceOptions) -> Services {
    test_services_with_clock(test_name, Arc::new(SystemClock), options)
}

pub fn test_services_with_clock(
    test_name: &str,
    clock: Arc<dyn Clock>,
    options: ServiceOptions,
) -> Services {
    Services::new(test_store(test_name), clock, options)
}

pub fn register_operator(services: &Services, email: &str) -> Operator {
    services
        .directory
        .register_operator(NewOperatorRequest {
            email: email.to_string(),
            password_hash: "$2b$10$operator".to_string(),
            operator_type: "PUBLIC".to_string(),
        })
        .expect("operator registration should succeed")
}

pub fn register_consumer(services: &Services, email: &str) -> Consumer {
    services
        .directory
        .register_consumer(NewConsumerRequest {
            email: email.to_string(),
            password_hash: "$2b$10$consumer".to_string(),
            name: "Test Consumer".to_string(),
        })
        .expect("consumer registration should succeed")
}

fn test_db_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = Path::new("target").join("testdb");
        std::fs::create_dir_all(&dir).expect("test db dir should be creatable");
        dir
    })
}

/// Built once per test binary, keyed by schema version so an older template
/// is never reused after a migration is added.
fn migrated_template() -> &'static Path {
    static TEMPLATE: OnceLock<PathBuf> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        let path = test_db_dir().join(format!(
            "template-v{LATEST_SCHEMA_VERSION}-{}.sqlite",
            std::process::id()
        ));
        if path.exists() {
            std::fs::remove_file(&path).expect("stale template should be removable");
        }

        let mut connection =
            open_connection(path.to_string_lossy().as_ref()).expect("template db should open");
        run_migrations(&mut connection).expect("template migrations should succeed");
        path
    })
}
