//! Gamified study progress
//!
//! Points, XP and levels, daily streaks, the daily challenge, achievements and
//! per-topic completion for one user, driven by [`Event`]s through a
//! [`ProgressEngine`].

pub mod achievements;
pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod leveling;
pub mod rank;
pub mod rules;
pub mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::ProgressEngine;
pub use error::ProgressError;
pub use event::{Event, Notification, NotificationKind};
pub use rank::Rank;
pub use rules::{Rules, StreakTrigger};
pub use state::{CardId, ProgressState, TopicProgress};
