use std::future::Future;

use anyhow::Context;
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyPool, Transaction};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::{self, Retry};
use crate::error::{is_transient, StoreError, StoreResult};

pub type AnyTransaction = Transaction<'static, Any>;

/// Owns the connection pool and the retry policy every store operation goes
/// through.
///
/// Cloning is cheap and clones share the pool.
#[derive(Clone)]
pub struct ConnectionManager {
    pool: AnyPool,
    retry: Retry,
}

impl ConnectionManager {
    /// Connect to a database by URL, backing off on transient failures.
    pub async fn connect(database: &config::Database, retry: Retry) -> anyhow::Result<Self> {
        let mut attempt = 0;
        let pool = loop {
            let connected = AnyPoolOptions::new()
                .max_connections(database.max_connections)
                .acquire_timeout(database.acquire_timeout())
                .connect(&database.url)
                .await;
            match connected {
                Ok(pool) => break pool,
                Err(e) if attempt < retry.max_retries && is_transient(&e) => {
                    let delay = retry.delay(attempt);
                    attempt += 1;
                    warn!(
                        "database connection failed, retrying in {delay:?} ({left} retries left): {e}",
                        left = retry.max_retries - attempt
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e).context("failed to connect to database"),
            }
        };

        info!(
            "database pool ready: max_connections={}, acquire_timeout={:?}",
            database.max_connections,
            database.acquire_timeout()
        );

        Ok(ConnectionManager { pool, retry })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run a non-mutating operation against the pool.
    ///
    /// Transient failures are retried within the retry budget; the whole call,
    /// backoff included, is bounded by `deadline`.
    pub async fn run<T, F, Fut>(&self, deadline: Instant, mut op: F) -> StoreResult<T>
    where
        F: FnMut(AnyPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            let result = timeout_at(deadline, op(self.pool.clone()))
                .await
                .map_err(|_| StoreError::DeadlineExceeded)?;
            match result {
                Ok(value) => return Ok(value),
                Err(e) => self.backoff(&mut attempt, deadline, e).await?,
            }
        }
    }

    /// Run a mutating operation inside a transaction.
    ///
    /// `op` receives the open transaction and hands it back with its result.
    /// Everything up to the commit races the deadline; when the deadline wins
    /// the transaction is dropped and rolled back, so `DeadlineExceeded`
    /// always means nothing was applied. An issued commit is awaited to
    /// completion and is never retried.
    pub async fn transaction<T, F, Fut>(&self, deadline: Instant, mut op: F) -> StoreResult<T>
    where
        F: FnMut(AnyTransaction) -> Fut,
        Fut: Future<Output = Result<(AnyTransaction, T), sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            let pool = self.pool.clone();
            let staged = timeout_at(deadline, async {
                let tx = pool.begin().await?;
                op(tx).await
            })
            .await
            .map_err(|_| StoreError::DeadlineExceeded)?;

            match staged {
                Ok((tx, value)) => {
                    tx.commit().await?;
                    return Ok(value);
                }
                Err(e) => self.backoff(&mut attempt, deadline, e).await?,
            }
        }
    }

    async fn backoff(
        &self,
        attempt: &mut u32,
        deadline: Instant,
        error: sqlx::Error,
    ) -> StoreResult<()> {
        if !is_transient(&error) {
            return Err(error.into());
        }
        if *attempt >= self.retry.max_retries {
            warn!("giving up after {attempt} retries: {error}");
            return Err(error.into());
        }

        let delay = self.retry.delay(*attempt);
        *attempt += 1;
        if Instant::now() + delay >= deadline {
            return Err(StoreError::DeadlineExceeded);
        }

        debug!("transient store error, retry {attempt} in {delay:?}: {error}");
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
