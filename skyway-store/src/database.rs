use skyway_core::CoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        let migrator = sqlx::migrate!("../migrations");
        info!(migrations = migrator.iter().count(), "Applying schema migrations");
        migrator.run(&self.pool).await?;
        info!("Schema is up to date");
        Ok(())
    }
}

pub(crate) fn db_error(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}

/// Text columns hold enum names; anything unparseable means the row is corrupt.
pub(crate) fn column<T>(value: &str) -> Result<T, CoreError>
where
    T: std::str::FromStr<Err = CoreError>,
{
    value
        .parse()
        .map_err(|e: CoreError| CoreError::Storage(format!("Unexpected column value: {}", e)))
}

pub(crate) fn to_u32(value: i32, field: &str) -> Result<u32, CoreError> {
    u32::try_from(value).map_err(|_| CoreError::Storage(format!("Negative {}: {}", field, value)))
}
