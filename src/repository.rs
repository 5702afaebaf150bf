use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::db::ConnectionManager;
use crate::error::StoreResult;
use crate::models::{to_millis, Paste, PasteId, PasteRow};

/// Data access for the `paste` table. No expiry or burn policy lives here.
pub trait PasteRepository: Send + Sync {
    /// Insert a new paste. Fails with `Conflict` if the id is taken.
    fn insert(&self, paste: &Paste, deadline: Instant)
        -> impl Future<Output = StoreResult<()>> + Send;

    /// Get a paste by id, exactly as stored.
    fn find_by_id(
        &self,
        id: PasteId,
        deadline: Instant,
    ) -> impl Future<Output = StoreResult<Option<Paste>>> + Send;

    /// Delete a paste by id, reporting whether this call removed it.
    fn delete_by_id(
        &self,
        id: PasteId,
        deadline: Instant,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Delete every non-burn paste whose expiry is at or before `cutoff`.
    fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        deadline: Instant,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Atomically delete a burn paste and return the deleted row.
    ///
    /// Of any number of concurrent calls for one id, at most one gets `Some`.
    fn take_burn_by_id(
        &self,
        id: PasteId,
        deadline: Instant,
    ) -> impl Future<Output = StoreResult<Option<Paste>>> + Send;

    /// Number of stored rows, live or not.
    fn count(&self, deadline: Instant) -> impl Future<Output = StoreResult<u64>> + Send;
}

const COLUMNS: &str = "id, content, language, burn, expiry_at, created_at";

/// [`PasteRepository`] over any database sqlx's `Any` driver supports.
#[derive(Clone)]
pub struct SqlPasteRepository {
    conn: ConnectionManager,
}

impl SqlPasteRepository {
    pub fn new(conn: ConnectionManager) -> Self {
        SqlPasteRepository { conn }
    }

    /// Create the paste table and its expiry index if they are missing.
    pub async fn migrate(&self, deadline: Instant) -> StoreResult<()> {
        self.conn
            .transaction(deadline, |mut tx| async move {
                sqlx::query(
                    "CREATE TABLE IF NOT EXISTS paste (
                        id TEXT PRIMARY KEY NOT NULL,
                        content TEXT NOT NULL,
                        language TEXT NOT NULL,
                        burn BOOLEAN NOT NULL,
                        expiry_at BIGINT,
                        created_at BIGINT NOT NULL
                    )",
                )
                .execute(&mut tx)
                .await?;
                sqlx::query("CREATE INDEX IF NOT EXISTS paste_expiry_at ON paste (expiry_at)")
                    .execute(&mut tx)
                    .await?;
                Ok((tx, ()))
            })
            .await
    }
}

impl PasteRepository for SqlPasteRepository {
    async fn insert(&self, paste: &Paste, deadline: Instant) -> StoreResult<()> {
        self.conn
            .transaction(deadline, |mut tx| {
                let id = paste.id.to_string();
                let content = paste.content.clone();
                let language = paste.language.clone();
                let expiry_at = paste.expiry_at.map(to_millis);
                let created_at = to_millis(paste.created_at);
                let burn = paste.burn;
                async move {
                    sqlx::query(
                        "INSERT INTO paste (id, content, language, burn, expiry_at, created_at) \
                         VALUES ($1, $2, $3, $4, $5, $6)",
                    )
                    .bind(id)
                    .bind(content)
                    .bind(language)
                    .bind(burn)
                    .bind(expiry_at)
                    .bind(created_at)
                    .execute(&mut tx)
                    .await?;
                    Ok((tx, ()))
                }
            })
            .await
    }

    async fn find_by_id(&self, id: PasteId, deadline: Instant) -> StoreResult<Option<Paste>> {
        let row = self
            .conn
            .run(deadline, |pool| async move {
                sqlx::query_as::<_, PasteRow>(&format!("SELECT {COLUMNS} FROM paste WHERE id = $1"))
                    .bind(id.to_string())
                    .fetch_optional(&pool)
                    .await
            })
            .await?;
        Ok(row.map(PasteRow::into_paste).transpose()?)
    }

    async fn delete_by_id(&self, id: PasteId, deadline: Instant) -> StoreResult<bool> {
        self.conn
            .transaction(deadline, |mut tx| async move {
                let result = sqlx::query("DELETE FROM paste WHERE id = $1")
                    .bind(id.to_string())
                    .execute(&mut tx)
                    .await?;
                Ok((tx, result.rows_affected() > 0))
            })
            .await
    }

    async fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        deadline: Instant,
    ) -> StoreResult<u64> {
        let cutoff = to_millis(cutoff);
        self.conn
            .transaction(deadline, |mut tx| async move {
                let result = sqlx::query(
                    "DELETE FROM paste \
                     WHERE expiry_at IS NOT NULL AND expiry_at <= $1 AND burn = $2",
                )
                .bind(cutoff)
                .bind(false)
                .execute(&mut tx)
                .await?;
                Ok((tx, result.rows_affected()))
            })
            .await
    }

    async fn take_burn_by_id(&self, id: PasteId, deadline: Instant) -> StoreResult<Option<Paste>> {
        let row = self
            .conn
            .transaction(deadline, |mut tx| async move {
                // the store serializes concurrent deletes of one row, so only
                // one statement can see it in RETURNING
                let row = sqlx::query_as::<_, PasteRow>(&format!(
                    "DELETE FROM paste WHERE id = $1 AND burn = $2 RETURNING {COLUMNS}"
                ))
                .bind(id.to_string())
                .bind(true)
                .fetch_optional(&mut tx)
                .await?;
                Ok((tx, row))
            })
            .await?;
        Ok(row.map(PasteRow::into_paste).transpose()?)
    }

    async fn count(&self, deadline: Instant) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .run(deadline, |pool| async move {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM paste")
                    .fetch_one(&pool)
                    .await
            })
            .await?;
        Ok(count.try_into().unwrap_or_default())
    }
}
