use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::burn::{BurnCoordinator, Consumed};
use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::expiry::is_live;
use crate::models::{NewPaste, Paste, PasteId};
use crate::repository::PasteRepository;

/// How many fresh ids `create` draws before giving up on collisions.
pub const MAX_ID_ATTEMPTS: u32 = 4;

/// Create, read and reclaim pastes.
///
/// Holds no mutable state of its own; every guarantee is enforced by the
/// store, so any number of services may share one database.
pub struct PasteService<R, C = SystemClock> {
    repo: R,
    burn: BurnCoordinator<R>,
    clock: C,
}

impl<R: PasteRepository + Clone> PasteService<R> {
    pub fn new(repo: R) -> Self {
        PasteService::with_clock(repo, SystemClock)
    }
}

impl<R: PasteRepository + Clone, C: Clock> PasteService<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        PasteService {
            burn: BurnCoordinator::new(repo.clone()),
            repo,
            clock,
        }
    }

    /// Store a new paste under a fresh random id.
    pub async fn create(&self, new_paste: NewPaste, deadline: Instant) -> StoreResult<PasteId> {
        let mut paste = new_paste.into_paste(PasteId::generate(), self.clock.now());

        for attempt in 1..=MAX_ID_ATTEMPTS {
            match self.repo.insert(&paste, deadline).await {
                Ok(()) => {
                    info!(
                        "new paste: id='{id}', language='{language}', burn={burn}, size={size}",
                        id = paste.id,
                        language = paste.language,
                        burn = paste.burn,
                        size = paste.content.len()
                    );
                    return Ok(paste.id);
                }
                Err(StoreError::Conflict) => {
                    warn!("paste id collision on attempt {attempt}: {}", paste.id);
                    paste.id = PasteId::generate();
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::StorageUnavailable {
            source: format!("no unused paste id after {MAX_ID_ATTEMPTS} attempts").into(),
        })
    }

    /// Fetch a live paste, consuming it if it is burn-after-read.
    ///
    /// Ids that are malformed, unknown, expired or already burned are all
    /// `NotFound`.
    pub async fn get(&self, id: &str, deadline: Instant) -> StoreResult<Paste> {
        let id: PasteId = id.parse().map_err(|_| StoreError::NotFound)?;

        let paste = self
            .repo
            .find_by_id(id, deadline)
            .await?
            .ok_or(StoreError::NotFound)?;
        let now = self.clock.now();

        if paste.burn {
            return match self.burn.consume_for_read(id, now, deadline).await? {
                Consumed::Delivered(paste) => {
                    info!("burned paste: id='{id}'");
                    Ok(paste)
                }
                Consumed::Gone => Err(StoreError::NotFound),
            };
        }

        if !is_live(&paste, now) {
            debug!("paste {id} expired, deleting");
            // the next sweep catches anything this misses
            if let Err(e) = self.repo.delete_by_id(id, deadline).await {
                warn!("failed to delete expired paste {id}: {e}");
            }
            return Err(StoreError::NotFound);
        }

        Ok(paste)
    }

    /// Reclaim storage held by non-burn pastes that expired at or before
    /// `cutoff`. Safe to run repeatedly and alongside everything else.
    pub async fn sweep(&self, cutoff: DateTime<Utc>, deadline: Instant) -> StoreResult<u64> {
        let count = self.repo.delete_expired_before(cutoff, deadline).await?;

        if count > 0 {
            info!("deleted {count} expired pastes");
        }

        Ok(count)
    }

    /// The service's idea of now, for callers computing expiry or cutoffs.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}
