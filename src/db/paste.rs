use chrono::{Duration, Utc};
use tracing::info;

use super::{is_unique_violation, Database};
use crate::error::{ApiError, ApiResult};
use crate::models::Paste;
use crate::token;

/// Bound on insert attempts before the token space is declared exhausted.
const MAX_TOKEN_ATTEMPTS: usize = 100;

const PASTE_COLUMNS: &str =
    "id, token, owner_id, public, document, created_at, updated_at, deleted_at";

impl Database {
    /// Create a paste, allocating a fresh token.
    ///
    /// Allocation is optimistic: generate a candidate, attempt the insert,
    /// and treat a uniqueness violation as a collision to retry with a new
    /// candidate. Retries stay within one transaction and are capped at
    /// [`MAX_TOKEN_ATTEMPTS`], after which this fails with `IdExhaustion`.
    /// Anonymous pastes (no owner) are always public.
    pub async fn add_paste(
        &self,
        document: &str,
        public: bool,
        owner_id: Option<i64>,
        token_length: usize,
    ) -> ApiResult<Paste> {
        let public = owner_id.is_none() || public;
        let now = Utc::now();
        let insert_sql = format!(
            "INSERT INTO paste (token, owner_id, public, document, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {PASTE_COLUMNS}"
        );

        let mut tx = self.pool.begin().await?;
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let candidate = token::generate(token_length);
            let result = sqlx::query_as::<_, Paste>(&insert_sql)
                .bind(&candidate)
                .bind(owner_id)
                .bind(public)
                .bind(document)
                .bind(now)
                .bind(now)
                .fetch_one(&mut tx)
                .await;

            match result {
                Ok(paste) => {
                    tx.commit().await?;
                    info!("new paste: token='{}', size={}", paste.token, document.len());
                    return Ok(paste);
                }
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // dropping the transaction rolls back the failed attempts
        Err(ApiError::IdExhaustion)
    }

    /// Get a non-deleted paste by token.
    pub async fn get_paste_by_token(&self, token: &str) -> ApiResult<Paste> {
        let paste = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE token = ? AND deleted_at IS NULL"
        ))
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(paste)
    }

    /// Get a non-deleted paste by id.
    pub async fn get_paste_by_id(&self, id: i64) -> ApiResult<Paste> {
        let paste = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(paste)
    }

    /// List an owner's non-deleted pastes, most recently updated first.
    pub async fn list_pastes_by_owner(&self, owner_id: i64, limit: i64) -> ApiResult<Vec<Paste>> {
        let pastes = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE owner_id = ? AND deleted_at IS NULL \
             ORDER BY updated_at DESC LIMIT ?"
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(pastes)
    }

    /// Replace a paste's document, bumping `updated_at`.
    pub async fn update_paste_document(&self, id: i64, document: &str) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE paste SET document = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(document)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Change a paste's visibility, bumping `updated_at`. Re-applying the
    /// same value is a no-op in effect but still advances `updated_at`.
    pub async fn update_paste_visibility(&self, id: i64, public: bool) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE paste SET public = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(public)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete a paste. The row is retained but excluded from every
    /// subsequent lookup and listing.
    pub async fn soft_delete_paste(&self, id: i64) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE paste SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        tx.commit().await?;
        info!("soft-deleted paste: id={id}");
        Ok(())
    }

    /// Physically remove pastes that were soft-deleted more than
    /// `retention_secs` ago. Returns the number of rows purged.
    pub async fn purge_deleted_pastes(&self, retention_secs: u64) -> ApiResult<u64> {
        let cutoff = Utc::now() - Duration::seconds(retention_secs as i64);
        let result = sqlx::query("DELETE FROM paste WHERE deleted_at IS NOT NULL AND deleted_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
