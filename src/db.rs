use anyhow::{Context, Result};
use log::info;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connects the shared pool and brings the schema up to date.
pub async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Can't connect to database")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Can't run database migrations")?;

    info!("Database ready ({} connection(s) max)", config.max_connections);
    Ok(pool)
}
