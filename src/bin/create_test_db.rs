use std::path::Path;
use std::sync::{Arc, Mutex};

use evsync_core::adapters::db::{open_connection, run_migrations, schema_version};
use evsync_core::app::services::{
    NewConsumerRequest, NewOperatorRequest, NewOutletRequest, ServiceOptions, Services, Store,
};
use evsync_core::domain::clock::SystemClock;

#[derive(Debug, PartialEq)]
struct Args {
    path: String,
    force: bool,
    seed: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            path: if cfg!(windows) {
                ".\\data\\evsync_test.db".to_string()
            } else {
                "./data/evsync_test.db".to_string()
            },
            force: false,
            seed: false,
        }
    }
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_help();
            return;
        }
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = run(&args) {
        eprintln!("failed to create test db: {error}");
        std::process::exit(1);
    }
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Option<Args>, String> {
    let mut args = Args::default();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--path" => {
                args.path = raw
                    .next()
                    .ok_or_else(|| "--path requires a value".to_string())?;
            }
            "--force" => args.force = true,
            "--seed" => args.seed = true,
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(args))
}

fn run(args: &Args) -> Result<(), String> {
    let path = Path::new(&args.path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    if args.force && path.exists() {
        std::fs::remove_file(path)
            .map_err(|error| format!("failed to remove existing db file: {error}"))?;
    }

    let mut connection = open_connection(&args.path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;
    let version = schema_version(&connection).map_err(|error| error.to_string())?;

    println!("created/updated test db at: {}", args.path);
    println!("schema version: {version}");

    if args.seed {
        let services = Services::new(
            Store::new(Arc::new(Mutex::new(connection))),
            Arc::new(SystemClock),
            ServiceOptions::default(),
        );
        seed(&services).map_err(|error| error.to_string())?;
        println!("seeded demo operator, consumer, stations and outlets");
    }

    Ok(())
}

fn seed(services: &Services) -> Result<(), evsync_core::app::services::ServiceError> {
    let operator = services.directory.register_operator(NewOperatorRequest {
        email: "operator@evsync.local".to_string(),
        password_hash: "$2b$10$demo-operator".to_string(),
        operator_type: "PUBLIC".to_string(),
    })?;
    services.directory.register_consumer(NewConsumerRequest {
        email: "driver@evsync.local".to_string(),
        password_hash: "$2b$10$demo-driver".to_string(),
        name: "Demo Driver".to_string(),
    })?;

    for (latitude, longitude) in [(40.6405, -8.6538), (41.1579, -8.6291)] {
        let station = services
            .stations
            .create_station(operator.id, latitude, longitude)?;
        for (cost_per_hour, max_power_kw) in [(2.5, 22.0), (6.0, 50.0)] {
            services.outlets.create_outlet(NewOutletRequest {
                station_id: Some(station.id),
                cost_per_hour,
                max_power_kw,
                status: None,
            })?;
        }
    }

    Ok(())
}

fn print_help() {
    println!("create_test_db");
    println!();
    println!("Usage:");
    println!("  cargo run --bin create_test_db -- [--path <file>] [--force] [--seed]");
    println!();
    println!("Options:");
    println!("  --path <file>   target sqlite file (default: ./data/evsync_test.db)");
    println!("  --force         delete existing file before creating");
    println!("  --seed          insert a demo operator, consumer, stations and outlets");
}

#[cfg(test)]
mod tests {
    use super::{Args, parse_args};

    fn parse(raw: &[&str]) -> Result<Option<Args>, String> {
        parse_args(raw.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_all_flags() {
        let args = parse(&["--force", "--path", "/tmp/x.db", "--seed"])
            .expect("args should parse")
            .expect("args should not be help");

        assert_eq!(
            args,
            Args {
                path: "/tmp/x.db".to_string(),
                force: true,
                seed: true,
            }
        );
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(&["--seed", "-h"]), Ok(None));
    }

    #[test]
    fn rejects_missing_path_value_and_unknown_flags() {
        assert_eq!(
            parse(&["--path"]),
            Err("--path requires a value".to_string())
        );
        assert_eq!(
            parse(&["--verbose"]),
            Err("unknown argument: --verbose".to_string())
        );
    }
}
