use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use sitewatch_common::{SiteStatus, SitewatchError};

use crate::is_unique_violation;

/// Columns selected for every site read, including the owned page count.
const SITE_COLUMNS: &str = r#"
    s.id, s.name, s.domain, s.crawl_interval, s.last_crawled_at, s.status,
    s.error_message, s.created_at, s.updated_at,
    (SELECT COUNT(*) FROM pages p WHERE p.site_id = s.id) AS page_count
"#;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub crawl_interval: String,
    pub last_crawled_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: SiteStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub page_count: i64,
}

/// Partial update. `None` leaves the column as is. The domain is expected to
/// be normalized already.
#[derive(Debug, Clone, Default)]
pub struct SiteChanges {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub crawl_interval: Option<String>,
}

impl Site {
    pub async fn create(
        name: &str,
        domain: &str,
        crawl_interval: &str,
        pool: &PgPool,
    ) -> Result<Self, SitewatchError> {
        if Self::find_by_domain(domain, pool).await?.is_some() {
            return Err(SitewatchError::DuplicateDomain(domain.to_string()));
        }

        let id = Uuid::new_v4();
        let inserted = sqlx::query(
            r#"
            INSERT INTO sites (id, name, domain, crawl_interval)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(domain)
        .bind(crawl_interval)
        .execute(pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(SitewatchError::DuplicateDomain(domain.to_string()))
            }
            Err(e) => return Err(SitewatchError::Database(e.to_string())),
        }

        Self::find_by_id(id, pool)
            .await?
            .ok_or_else(|| SitewatchError::NotFound("Site".to_string()))
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites s WHERE s.id = $1");
        sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_domain(domain: &str, pool: &PgPool) -> Result<Option<Self>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites s WHERE s.domain = $1");
        sqlx::query_as::<_, Self>(&sql)
            .bind(domain)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Newest first.
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites s ORDER BY s.created_at DESC");
        sqlx::query_as::<_, Self>(&sql)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Sites eligible for scheduled crawling, never-crawled first.
    pub async fn find_active(pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {SITE_COLUMNS} FROM sites s WHERE s.status = 'active' \
             ORDER BY s.last_crawled_at ASC NULLS FIRST"
        );
        sqlx::query_as::<_, Self>(&sql)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn update(
        id: Uuid,
        changes: &SiteChanges,
        pool: &PgPool,
    ) -> Result<Self, SitewatchError> {
        if let Some(domain) = changes.domain.as_deref() {
            let taken: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM sites WHERE domain = $1 AND id <> $2")
                    .bind(domain)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| SitewatchError::Database(e.to_string()))?;
            if taken.is_some() {
                return Err(SitewatchError::DuplicateDomain(domain.to_string()));
            }
        }

        let updated = sqlx::query(
            r#"
            UPDATE sites
            SET name           = COALESCE($2, name),
                domain         = COALESCE($3, domain),
                crawl_interval = COALESCE($4, crawl_interval),
                updated_at     = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.domain.as_deref())
        .bind(changes.crawl_interval.as_deref())
        .execute(pool)
        .await;

        let rows = match updated {
            Ok(r) => r.rows_affected(),
            Err(e) if is_unique_violation(&e) => {
                return Err(SitewatchError::DuplicateDomain(
                    changes.domain.clone().unwrap_or_default(),
                ))
            }
            Err(e) => return Err(SitewatchError::Database(e.to_string())),
        };

        if rows == 0 {
            return Err(SitewatchError::NotFound("Site".to_string()));
        }

        Self::find_by_id(id, pool)
            .await?
            .ok_or_else(|| SitewatchError::NotFound("Site".to_string()))
    }

    /// Delete a site and, by cascade, all of its pages. Returns false if absent.
    pub async fn delete(id: Uuid, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Successful crawl: back to active, error cleared, timestamp advanced.
    pub async fn record_crawl_success(id: Uuid, at: DateTime<Utc>, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sites
            SET status = 'active', last_crawled_at = $2, error_message = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Failed crawl: `last_crawled_at` is left alone.
    pub async fn record_crawl_failure(id: Uuid, message: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sites
            SET status = 'error', error_message = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }
}
