use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use crate::error::StoreResult;
use crate::expiry::is_live;
use crate::models::{Paste, PasteId};
use crate::repository::PasteRepository;

/// Outcome of trying to consume a burn-after-read paste.
#[derive(Debug)]
pub enum Consumed {
    /// This caller won the paste. Nobody else ever will.
    Delivered(Paste),
    /// Already consumed, expired, never existed, or not a burn paste.
    Gone,
}

/// Read-and-consume for burn-after-read pastes.
///
/// Consumption is a single delete-returning statement in the store, so the
/// guarantee holds across every process sharing the database.
pub struct BurnCoordinator<R> {
    repo: R,
}

impl<R: PasteRepository> BurnCoordinator<R> {
    pub fn new(repo: R) -> Self {
        BurnCoordinator { repo }
    }

    pub async fn consume_for_read(
        &self,
        id: PasteId,
        now: DateTime<Utc>,
        deadline: Instant,
    ) -> StoreResult<Consumed> {
        let Some(paste) = self.repo.take_burn_by_id(id, deadline).await? else {
            return Ok(Consumed::Gone);
        };

        // an expired burn paste is reclaimed by the delete above but never shown
        if !is_live(&paste, now) {
            debug!("burn paste {id} consumed after expiry");
            return Ok(Consumed::Gone);
        }

        Ok(Consumed::Delivered(paste))
    }
}
