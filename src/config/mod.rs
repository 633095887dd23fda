//! Process configuration read from the environment at startup.
use crate::state::DEFAULT_MAX_BID_RETRIES;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Credentials for the customer-service account created on first start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRep {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub kafka_brokers: String,
    pub events_topic: String,
    pub events_partitions: i32,
    pub listen_addr: String,
    pub max_bid_retries: u32,
    pub bootstrap_rep: Option<BootstrapRep>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bootstrap_rep = match (
            lookup("BOOTSTRAP_REP_USERNAME"),
            lookup("BOOTSTRAP_REP_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapRep {
                email: lookup("BOOTSTRAP_REP_EMAIL")
                    .unwrap_or_else(|| format!("{}@localhost", username)),
                username,
                password,
            }),
            (Some(_), None) => return Err(ConfigError::Missing("BOOTSTRAP_REP_PASSWORD")),
            _ => None,
        };

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            kafka_brokers: lookup("KAFKA_BROKERS").unwrap_or_else(|| "localhost:9092".into()),
            events_topic: lookup("EVENTS_TOPIC").unwrap_or_else(|| "events".into()),
            events_partitions: parse_or(&lookup, "EVENTS_PARTITIONS", 5)?,
            listen_addr: lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            max_bid_retries: parse_or(&lookup, "MAX_BID_RETRIES", DEFAULT_MAX_BID_RETRIES)?,
            bootstrap_rep,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
