//! Connection bootstrap from the process environment.
//!
//! [`connect`] opens a pooled client and waits until the server answers a `ping`
//! before handing back a [`MongoDbStore`]. Configuration comes from `DB_URL`
//! (required) and `DB_NAME` (optional), with `.env` files honoured through `dotenvy`.

use std::time::Duration;

use bson::doc;
use mongodb::{Client, options::ClientOptions};
use docbase_core::error::{AppError, AppResult};

use crate::store::{MongoDbStore, map_driver_error};


/// Environment variable holding the connection string.
pub const DB_URL_VAR: &str = "DB_URL";
/// Environment variable naming the database when the connection string does not.
pub const DB_NAME_VAR: &str = "DB_NAME";
/// Database used when neither the connection string nor `DB_NAME` names one.
pub const DEFAULT_DATABASE: &str = "test";

/// Connection pool limits applied to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPolicy {
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub max_idle_time: Duration,
    /// How long an operation waits for a usable connection.
    pub wait_queue_timeout: Duration,
}

impl PoolPolicy {
    pub const DEFAULT: PoolPolicy = PoolPolicy {
        max_pool_size: 10,
        min_pool_size: 2,
        max_idle_time: Duration::from_secs(30),
        wait_queue_timeout: Duration::from_secs(5),
    };

    pub(crate) fn apply(&self, options: &mut ClientOptions) {
        options.max_pool_size = Some(self.max_pool_size);
        options.min_pool_size = Some(self.min_pool_size);
        options.max_idle_time = Some(self.max_idle_time);
        // The driver has no separate checkout timeout; waiting for a server bounds it instead.
        options.server_selection_timeout = Some(self.wait_queue_timeout);
    }
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where and what to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub database: Option<String>,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), database: None }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Reads the configuration from the process environment, loading `.env` first if present.
    pub fn from_env() -> AppResult<Self> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                tracing::warn!(%error, "failed to load .env file");
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let url = lookup(DB_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!(variable = DB_URL_VAR, "database connection string is not set");
                AppError::Database
            })?;

        Ok(Self {
            url,
            database: lookup(DB_NAME_VAR).filter(|name| !name.trim().is_empty()),
        })
    }
}

/// Opens a client under [`PoolPolicy::DEFAULT`] and waits for the server to answer a `ping`.
pub async fn connect(config: ConnectionConfig) -> AppResult<MongoDbStore> {
    let mut options = ClientOptions::parse(&config.url)
        .await
        .map_err(|error| {
            tracing::error!(%error, "invalid database connection string");
            AppError::Database
        })?;

    PoolPolicy::DEFAULT.apply(&mut options);

    let database = options.default_database
        .clone()
        .or(config.database)
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options)
        .map_err(|error| {
            tracing::error!(%error, "failed to create database client");
            AppError::Database
        })?;

    if let Err(error) = client.database(&database).run_command(doc! { "ping": 1 }).await {
        let error = map_driver_error(error);
        tracing::error!(%database, %error, "database connection failed");
        return Err(AppError::from(error));
    }

    tracing::info!(%database, "connected to database");

    Ok(MongoDbStore::new(client, database))
}

/// Reads [`ConnectionConfig::from_env`] and [`connect`]s with it.
pub async fn connect_from_env() -> AppResult<MongoDbStore> {
    connect(ConnectionConfig::from_env()?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_url_is_a_database_error() {
        assert!(matches!(ConnectionConfig::from_lookup(lookup(&[])), Err(AppError::Database)));
        assert!(matches!(
            ConnectionConfig::from_lookup(lookup(&[("DB_URL", "  "), ("DB_NAME", "app")])),
            Err(AppError::Database)
        ));
    }

    #[test]
    fn database_name_is_optional() {
        let config = ConnectionConfig::from_lookup(lookup(&[("DB_URL", "mongodb://localhost:27017")])).unwrap();
        assert_eq!(config, ConnectionConfig::new("mongodb://localhost:27017"));

        let config = ConnectionConfig::from_lookup(lookup(&[
            ("DB_URL", "mongodb://localhost:27017"),
            ("DB_NAME", "app"),
        ]))
        .unwrap();
        assert_eq!(config.database.as_deref(), Some("app"));
    }

    #[test]
    fn pool_policy_is_applied_to_client_options() {
        let mut options = ClientOptions::default();

        PoolPolicy::default().apply(&mut options);

        assert_eq!(options.max_pool_size, Some(10));
        assert_eq!(options.min_pool_size, Some(2));
        assert_eq!(options.max_idle_time, Some(Duration::from_secs(30)));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn malformed_url_fails_before_any_network_activity() {
        let result = connect(ConnectionConfig::new("definitely not a uri")).await;

        assert!(matches!(result, Err(AppError::Database)));
    }
}
