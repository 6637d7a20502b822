//! Study events in, notifications out

use std::fmt;

use serde::{Deserialize, Serialize};

/// A study event raised by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A study session begins (page load, app start)
    StartSession,
    /// A card was flipped to its answer
    CompleteCard { topic: String, index: u32 },
    /// The user sent a deck back to its first card
    RestartTopic { topic: String },
    /// The session timer advanced
    Tick { seconds: u64 },
    /// A calendar-day boundary may have passed
    DailyReset,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Points,
    LevelUp,
    Streak,
    Challenge,
    Achievement,
    Milestone,
    Info,
}

/// Something the presentation layer should tell the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), amount: None }
    }

    pub fn with_amount(kind: NotificationKind, message: impl Into<String>, amount: u64) -> Self {
        Self { kind, message: message.into(), amount: Some(amount) }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            NotificationKind::Points => "points",
            NotificationKind::LevelUp => "level up",
            NotificationKind::Streak => "streak",
            NotificationKind::Challenge => "challenge",
            NotificationKind::Achievement => "achievement",
            NotificationKind::Milestone => "milestone",
            NotificationKind::Info => "info",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}
