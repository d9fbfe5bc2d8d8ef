//! Postgres persistence for sites, discovered pages, and settings.

pub mod pages;
pub mod settings;
pub mod sites;

pub use pages::{Page, PageFilter, PageListing, PageWithSite, SiteSummary};
pub use settings::Setting;
pub use sites::{Site, SiteChanges};

pub use sqlx::PgPool;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

/// Connect to Postgres and bring the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Run the embedded SQL migrations. Idempotent.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run DB migrations")?;
    tracing::info!("Migrations complete");
    Ok(())
}

/// Postgres `unique_violation`.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}
