#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use burnbin::clock::ManualClock;
use burnbin::config::{Database, Retry};
use burnbin::db::ConnectionManager;
use burnbin::repository::SqlPasteRepository;
use burnbin::PasteService;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tokio::time::Instant;

pub type Service = PasteService<SqlPasteRepository, ManualClock>;

/// A migrated SQLite store in a temporary directory, deleted on drop.
pub struct TestStore {
    pub service: Arc<Service>,
    pub repo: SqlPasteRepository,
    pub clock: ManualClock,
    _dir: TempDir,
}

pub async fn store() -> TestStore {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let database = Database {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("pastes.db").display()),
        max_connections: 8,
        acquire_timeout_secs: 300,
    };
    // generous budget: sqlite serializes writers and reports contention as busy
    let retry = Retry {
        max_retries: 20,
        base_delay_ms: 2,
        max_delay_ms: 100,
    };

    let conn = ConnectionManager::connect(&database, retry)
        .await
        .expect("failed to open test database");
    let repo = SqlPasteRepository::new(conn);
    repo.migrate(deadline()).await.expect("failed to migrate");

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    let service = Arc::new(PasteService::with_clock(repo.clone(), clock.clone()));

    TestStore {
        service,
        repo,
        clock,
        _dir: dir,
    }
}

pub fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(300)
}
