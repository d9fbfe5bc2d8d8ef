use std::collections::BTreeMap;

use anyhow::Result;
use sqlx::PgPool;

/// Process-wide key/value settings.
pub struct Setting;

impl Setting {
    pub async fn get(key: &str, pool: &PgPool) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> Result<BTreeMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Upsert a batch of settings in one transaction.
    pub async fn upsert_many(entries: &BTreeMap<String, String>, pool: &PgPool) -> Result<()> {
        let mut tx = pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value, updated_at)
                VALUES ($1, $2, now())
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
