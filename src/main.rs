mod clock;
mod config;
mod error;
mod voting;
mod web;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use clock::SystemClock;
use config::Config;
use web::db::{establish_pool, PgStore};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Configuration error: {err}");
            return ExitCode::FAILURE;
        },
    };

    info!("Connecting to database...");
    let pool = match establish_pool(&config) {
        Ok(pool) => pool,
        Err(err) => {
            error!("Could not connect to database: {err}");
            return ExitCode::FAILURE;
        },
    };

    info!("Starting server on {}", config.bind_address);
    if let Err(err) = web::setup(config, Arc::new(PgStore::new(pool)), Arc::new(SystemClock)).await {
        error!("Server failed: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
