//! Liveness of stored pastes with respect to their expiry timestamp.
//!
//! The read path, the burn path and the sweep path all decide expiry here.
//! The boundary is closed on `expiry_at`: a paste whose expiry equals `now`
//! is already expired.

use chrono::{DateTime, Utc};

use crate::models::Paste;

/// Whether `paste` is still readable at `now`.
pub fn is_live(paste: &Paste, now: DateTime<Utc>) -> bool {
    is_live_at(paste.expiry_at, now)
}

pub fn is_live_at(expiry_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expiry_at {
        Some(expiry_at) => expiry_at > now,
        None => true,
    }
}
