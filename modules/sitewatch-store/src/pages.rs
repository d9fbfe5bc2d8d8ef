use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Default and maximum page size for listings.
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,
    pub site_id: Uuid,
    pub url: String,
    pub title: String,
    pub discovered_at: DateTime<Utc>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSummary {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
}

/// A page as shown in listings, with its owning site embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWithSite {
    #[serde(flatten)]
    pub page: Page,
    pub site: SiteSummary,
}

#[derive(sqlx::FromRow)]
struct PageSiteRow {
    #[sqlx(flatten)]
    page: Page,
    site_name: String,
    site_domain: String,
}

impl From<PageSiteRow> for PageWithSite {
    fn from(row: PageSiteRow) -> Self {
        let site = SiteSummary {
            id: row.page.site_id,
            name: row.site_name,
            domain: row.site_domain,
        };
        Self {
            page: row.page,
            site,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub site_id: Option<Uuid>,
    pub is_read: Option<bool>,
    /// Case-insensitive substring match against title or URL.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageListing {
    pub pages: Vec<PageWithSite>,
    pub total: i64,
    pub unread_count: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Shared WHERE clause: every filter is optional and bound as a nullable parameter.
const FILTER_SQL: &str = r#"
    ($1::uuid IS NULL OR p.site_id = $1)
    AND ($2::boolean IS NULL OR p.is_read = $2)
    AND ($3::text IS NULL OR p.title ILIKE $3 OR p.url ILIKE $3)
"#;

impl Page {
    /// Every URL already recorded for a site.
    pub async fn known_urls(site_id: Uuid, pool: &PgPool) -> Result<HashSet<String>> {
        let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM pages WHERE site_id = $1")
            .bind(site_id)
            .fetch_all(pool)
            .await?;
        Ok(urls.into_iter().collect())
    }

    /// Insert an unread page. A URL the site already has is silently skipped;
    /// returns whether a row was written.
    pub async fn insert_if_new(
        site_id: Uuid,
        url: &str,
        title: &str,
        discovered_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO pages (id, site_id, url, title, discovered_at, is_read)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            ON CONFLICT (site_id, url) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(site_id)
        .bind(url)
        .bind(title)
        .bind(discovered_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list(filter: &PageFilter, pool: &PgPool) -> Result<PageListing> {
        let limit = filter.effective_limit();
        let offset = filter.effective_offset();
        let pattern = filter.search_pattern();

        let sql = format!(
            r#"
            SELECT p.id, p.site_id, p.url, p.title, p.discovered_at, p.is_read, p.created_at,
                   s.name AS site_name, s.domain AS site_domain
            FROM pages p
            JOIN sites s ON s.id = p.site_id
            WHERE {FILTER_SQL}
            ORDER BY p.discovered_at DESC, p.id
            LIMIT $4 OFFSET $5
            "#
        );
        let rows = sqlx::query_as::<_, PageSiteRow>(&sql)
            .bind(filter.site_id)
            .bind(filter.is_read)
            .bind(pattern.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_sql = format!(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE p.is_read = FALSE) AS unread
            FROM pages p
            WHERE {FILTER_SQL}
            "#
        );
        let (total, unread_count): (i64, i64) = sqlx::query_as(&count_sql)
            .bind(filter.site_id)
            .bind(filter.is_read)
            .bind(pattern.as_deref())
            .fetch_one(pool)
            .await?;

        Ok(PageListing {
            pages: rows.into_iter().map(Into::into).collect(),
            total,
            unread_count,
            limit,
            offset,
        })
    }

    pub async fn set_read(id: Uuid, is_read: bool, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE pages SET is_read = $2
            WHERE id = $1
            RETURNING id, site_id, url, title, discovered_at, is_read, created_at
            "#,
        )
        .bind(id)
        .bind(is_read)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Mark every unread page read, optionally scoped to one site. Returns rows changed.
    pub async fn mark_all_read(site_id: Option<Uuid>, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE pages SET is_read = TRUE
            WHERE is_read = FALSE AND ($1::uuid IS NULL OR site_id = $1)
            "#,
        )
        .bind(site_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
