use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// No live, unconsumed paste exists for the id.
    ///
    /// Never-existed, expired and already-burned pastes all report this.
    #[error("not found")]
    NotFound,
    #[error("paste id already exists")]
    Conflict,
    #[error("storage unavailable")]
    StorageUnavailable {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// The caller's deadline elapsed first. The operation had no effect.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    /// Whether the caller may reasonably try the same call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::DeadlineExceeded | StoreError::StorageUnavailable { .. }
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            _ if is_unique_violation(&source) => StoreError::Conflict,
            _ => StoreError::StorageUnavailable {
                source: Box::new(source),
            },
        }
    }
}

// sqlite reports extended result codes, postgres reports SQLSTATE.
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const PG_UNIQUE_VIOLATION: &str = "23505";

const SQLITE_TRANSIENT: &[&str] = &[
    "5",   // SQLITE_BUSY
    "6",   // SQLITE_LOCKED
    "261", // SQLITE_BUSY_RECOVERY
    "262", // SQLITE_LOCKED_SHAREDCACHE
    "517", // SQLITE_BUSY_SNAPSHOT
];
const PG_TRANSIENT: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "53300", // too_many_connections
    "57P01", // admin_shutdown
    "57P02", // crash_shutdown
    "57P03", // cannot_connect_now
];

fn database_code(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        database_code(error).as_deref(),
        Some(SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE | PG_UNIQUE_VIOLATION)
    )
}

/// Connectivity and contention failures that are worth retrying.
///
/// Logical errors (constraint violations, missing rows, decode failures) are
/// never transient.
pub(crate) fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(_) => match database_code(error) {
            Some(code) => {
                SQLITE_TRANSIENT.contains(&code.as_str())
                    || PG_TRANSIENT.contains(&code.as_str())
                    // connection_exception class
                    || code.starts_with("08")
            }
            None => false,
        },
        _ => false,
    }
}
