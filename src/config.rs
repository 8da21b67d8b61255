use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::FixedOffset;
use dotenvy::dotenv;
use tracing::info;
use url::Url;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_pool_size: u32,
    pub bind_address: SocketAddr,
    pub public_url: Url,
    pub sign_in_path: String,
    pub register_path: String,
    /// Offset that election calendar dates are interpreted in.
    pub utc_offset: FixedOffset,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let offset_minutes: i32 = try_load(&lookup, "ELECTION_UTC_OFFSET_MINUTES", "0")?;
        let utc_offset = offset_minutes.checked_mul(60)
            .filter(|_| offset_minutes.abs() < 24 * 60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                key: "ELECTION_UTC_OFFSET_MINUTES",
                message: format!("{offset_minutes} is not within a day of UTC"),
            })?;

        Ok(Config {
            database_url,
            database_pool_size: try_load(&lookup, "DATABASE_POOL_SIZE", "8")?,
            bind_address: try_load(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?,
            public_url: try_load(&lookup, "PUBLIC_URL", "http://localhost:3000")?,
            sign_in_path: try_load(&lookup, "SIGN_IN_PATH", "/sign-in")?,
            register_path: try_load(&lookup, "REGISTER_PATH", "/register")?,
            utc_offset,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid { key, message: e.to_string() })
}
