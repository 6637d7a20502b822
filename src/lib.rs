//! Flashdeck - gamified flashcard study progress
//!
//! Flashdeck tracks what a learner has studied across flashcard decks and turns
//! it into points, levels, streaks, a daily challenge and achievements.

pub mod app;
pub mod catalog;
pub mod config;
pub mod leaderboard;
pub mod progress;
pub mod saved;
pub mod store;

pub use app::App;
pub use catalog::{Catalog, Identity};
pub use config::Config;
pub use progress::{Event, Notification, ProgressEngine, ProgressState};
