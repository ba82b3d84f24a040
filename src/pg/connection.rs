use crate::config::ConnectionConfig;
use crate::util::{sanitize_url, Result, SchemaError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres, Row};

pub struct PgConnection {
    pool: Pool<Postgres>,
    server_version: i32,
}

impl PgConnection {
    /// Connects with a `postgres://` URL.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await
            .map_err(|e| {
                SchemaError::DatabaseError(format!(
                    "Failed to connect to {}: {e}",
                    sanitize_url(connection_string)
                ))
            })?;
        Self::from_pool(pool, &sanitize_url(connection_string)).await
    }

    /// Connects with one section of the configuration file.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Self::connect_with(config.connect_options(), &config.display_name()).await
    }

    pub async fn connect_with(options: PgConnectOptions, display_name: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                SchemaError::DatabaseError(format!("Failed to connect to {display_name}: {e}"))
            })?;
        Self::from_pool(pool, display_name).await
    }

    async fn from_pool(pool: Pool<Postgres>, display_name: &str) -> Result<Self> {
        let row = sqlx::query("SELECT current_setting('server_version_num')::int4 AS version")
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                SchemaError::DatabaseError(format!(
                    "Failed to read server version of {display_name}: {e}"
                ))
            })?;
        let server_version: i32 = row.get("version");
        tracing::info!(database = display_name, server_version, "connected");

        Ok(PgConnection {
            pool,
            server_version,
        })
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// `server_version_num`, e.g. `160002`.
    pub fn server_version(&self) -> i32 {
        self.server_version
    }
}
