//! Paste lifecycle and storage engine.
//!
//! Pastes are created once, read any number of times until they expire, or
//! read exactly once when flagged burn-after-read. All consistency comes from
//! the backing database, so any number of processes can share one store.

pub mod burn;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod expiry;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{StoreError, StoreResult};
pub use models::{NewPaste, Paste, PasteId};
pub use service::PasteService;
