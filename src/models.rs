use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque 128-bit paste identifier, rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasteId(Uuid);

impl PasteId {
    /// Draw a fresh id from the thread-local CSPRNG.
    pub fn generate() -> Self {
        PasteId(Uuid::from_bytes(rand::random()))
    }
}

impl fmt::Display for PasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed paste id")]
pub struct ParsePasteIdError;

impl FromStr for PasteId {
    type Err = ParsePasteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // only the plain and hyphenated forms, not braced or urn
        if s.len() != 32 && s.len() != 36 {
            return Err(ParsePasteIdError);
        }
        Uuid::try_parse(s).map(PasteId).map_err(|_| ParsePasteIdError)
    }
}

impl Serialize for PasteId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A stored paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paste {
    pub id: PasteId,
    pub content: String,
    pub language: String,
    pub burn: bool,
    pub expiry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything the caller decides about a paste before it is stored.
#[derive(Debug, Clone)]
pub struct NewPaste {
    pub content: String,
    pub language: String,
    pub burn: bool,
    pub expiry_at: Option<DateTime<Utc>>,
}

impl NewPaste {
    pub fn new(content: impl Into<String>, language: impl Into<String>) -> Self {
        NewPaste {
            content: content.into(),
            language: language.into(),
            burn: false,
            expiry_at: None,
        }
    }

    pub fn burn(mut self, burn: bool) -> Self {
        self.burn = burn;
        self
    }

    pub fn expiry_at(mut self, expiry_at: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.expiry_at = expiry_at.into();
        self
    }

    pub(crate) fn into_paste(self, id: PasteId, created_at: DateTime<Utc>) -> Paste {
        Paste {
            id,
            content: self.content,
            language: self.language,
            burn: self.burn,
            expiry_at: self.expiry_at,
            created_at,
        }
    }
}

/// A row of the `paste` table as the database sees it.
///
/// Timestamps are epoch milliseconds so every backend compares them as
/// integers.
#[derive(FromRow)]
pub(crate) struct PasteRow {
    pub id: String,
    pub content: String,
    pub language: String,
    pub burn: bool,
    pub expiry_at: Option<i64>,
    pub created_at: i64,
}

impl PasteRow {
    pub fn into_paste(self) -> Result<Paste, sqlx::Error> {
        let id = self
            .id
            .parse()
            .map_err(|e: ParsePasteIdError| decode_error("id", e))?;
        Ok(Paste {
            id,
            content: self.content,
            language: self.language,
            burn: self.burn,
            expiry_at: self.expiry_at.map(from_millis).transpose()?,
            created_at: from_millis(self.created_at)?,
        })
    }
}

pub(crate) fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| decode_error("timestamp", format!("{millis} out of range")))
}

fn decode_error(column: &str, error: impl fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_owned(),
        source: error.to_string().into(),
    }
}
