//! Tunable reward rules

use serde::{Deserialize, Serialize};

/// Numeric constants that drive point, XP, streak and challenge rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Points awarded for completing a card for the first time
    pub card_points: u64,

    /// Bonus points for finishing the daily challenge
    pub challenge_bonus: u64,

    /// Card completions needed to finish the daily challenge
    pub daily_target: u32,

    /// XP needed to leave level 1
    pub xp_base: u64,

    /// Growth factor of the XP threshold per level
    pub xp_growth: f64,

    /// A streak bonus is paid every time the streak reaches a multiple of this
    pub streak_bonus_interval: u32,

    /// Streak bonus = streak * multiplier
    pub streak_bonus_multiplier: u64,

    /// A session milestone is recorded every this many cards in one session
    pub session_milestone_interval: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            card_points: 10,
            challenge_bonus: 50,
            daily_target: 10,
            xp_base: 100,
            xp_growth: 1.5,
            streak_bonus_interval: 5,
            streak_bonus_multiplier: 2,
            session_milestone_interval: 10,
        }
    }
}

/// Which event extends the daily streak
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTrigger {
    /// Opening a study session counts as activity for the day
    #[default]
    SessionStart,
    /// Only a first-time card completion counts
    CardCompletion,
}
