use std::{env, net::SocketAddr, str::FromStr};

use chrono::Duration;
use log::warn;
use rand::Rng;

use crate::{
    constants::{
        DEFAULT_BIND_ADDRESS, DEFAULT_CONNECT_RETRIES, DEFAULT_MAX_CONNECTIONS,
        DEFAULT_SESSION_LIFETIME_HOURS,
    },
    error::Error,
    jwt::SessionKeys,
};

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Connection attempts before giving up, one second apart
    pub connect_retries: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs against the in-memory store
    pub database: Option<DatabaseConfig>,
    pub jwt_secret: Option<String>,
    pub session_lifetime_hours: i64,
}

impl Config {
    /// Reads the process environment, after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_address = parse(
            "BIND_ADDRESS",
            &get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        )?;

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: get("DATABASE_MAX_CONNECTIONS")
                    .map(|v| parse("DATABASE_MAX_CONNECTIONS", &v))
                    .transpose()?
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS),
                connect_retries: get("DATABASE_CONNECT_RETRIES")
                    .map(|v| parse("DATABASE_CONNECT_RETRIES", &v))
                    .transpose()?
                    .unwrap_or(DEFAULT_CONNECT_RETRIES),
            }),
            None => None,
        };

        let session_lifetime_hours = get("SESSION_LIFETIME_HOURS")
            .map(|v| parse::<i64>("SESSION_LIFETIME_HOURS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_SESSION_LIFETIME_HOURS);
        if session_lifetime_hours <= 0 {
            return Err(Error::Config(String::from(
                "SESSION_LIFETIME_HOURS must be positive",
            )));
        }

        Ok(Self {
            bind_address,
            database,
            jwt_secret: get("JWT_SECRET"),
            session_lifetime_hours,
        })
    }

    /// Without a configured secret a random one is generated, so sessions do not
    /// survive a restart.
    pub fn session_keys(&self) -> Result<SessionKeys, Error> {
        let lifetime = Duration::hours(self.session_lifetime_hours);

        match &self.jwt_secret {
            Some(secret) => SessionKeys::new(secret.as_bytes(), lifetime),
            None => {
                warn!("JWT_SECRET not set, using a random per-process secret");
                let secret: [u8; 32] = rand::thread_rng().gen();
                SessionKeys::new(&secret, lifetime)
            }
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {value}")))
}
