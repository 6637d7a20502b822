//! Error types for study events

use thiserror::Error;

/// Rejected study events. None of these change progress state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    /// The topic is not in the catalog
    #[error("Unknown topic '{0}'")]
    UnknownTopic(String),

    /// The card index is past the end of the deck
    #[error("Card {index} is out of range for '{topic}' ({total} cards)")]
    CardOutOfRange {
        /// Topic identifier
        topic: String,
        /// Requested zero-based index
        index: u32,
        /// Number of cards in the topic
        total: u32,
    },

    /// The user is not entitled to the subject that owns the topic
    #[error("Access denied to topic '{topic}'")]
    AccessDenied {
        /// Topic identifier
        topic: String,
    },
}

impl ProgressError {
    /// Check if this error was caused by bad event input rather than entitlement
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ProgressError::UnknownTopic(_) | ProgressError::CardOutOfRange { .. })
    }
}
