//! Bookmarked flashcards
//!
//! Users can save individual cards to revisit later, optionally with a short
//! note. Saved cards are kept per user in a single JSON file.

pub mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use storage::SavedCards;

/// A card a user bookmarked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCard {
    /// Unique across all users
    pub id: u64,
    pub topic: String,
    pub card_index: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SavedError {
    #[error("No saved card with id {0}")]
    NotFound(u64),
}
