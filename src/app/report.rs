//! Plain-text rendering of progress for the terminal

use std::fmt::Write;

use crate::catalog::Subject;
use crate::leaderboard::LeaderboardEntry;
use crate::progress::achievements::{self, ACHIEVEMENTS};
use crate::progress::leveling::xp_threshold;
use crate::progress::rank::{next_rank, rank_for_level};
use crate::progress::{Notification, ProgressState, Rules};
use crate::saved::SavedCard;

/// Help text for the study shell
pub const HELP: &str = "\
Commands:
  study <topic> <index>...   Complete cards
  stats                      Points, level, streak and today's challenge
  achievements               Earned and locked achievements
  topics                     Topics and completion
  restart <topic>            Send a deck back to its first card
  save <topic> <index> [note]
  saved                      Bookmarked cards
  unsave <id>                Remove a bookmark
  leaderboard                Top learners
  help                       This text
  quit                       Leave the shell";

/// One notification per line
pub fn notifications(notes: &[Notification]) -> String {
    notes.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// Format seconds as m:ss, or h:mm:ss past the hour
pub fn duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if h > 0 { format!("{h}:{m:02}:{s:02}") } else { format!("{m}:{s:02}") }
}

pub fn stats(state: &ProgressState, rules: &Rules, session_seconds: u64) -> String {
    let mut out = String::new();
    let rank = rank_for_level(state.level);

    let _ = writeln!(out, "Level {} - {}", state.level, rank.title);
    let _ = writeln!(out, "XP: {}/{}", state.xp, xp_threshold(state.level, rules));
    if let Some(next) = next_rank(state.level) {
        let _ = writeln!(out, "Next rank: {} at level {}", next.title, next.min_level);
    }
    let _ = writeln!(out, "Points: {}", state.points);
    let _ = writeln!(out, "Streak: {} day(s)", state.streak);
    let _ = writeln!(out, "Cards completed: {}", state.total_cards_completed);

    let challenge = &state.daily_challenge;
    let status = if challenge.completed { " (completed)" } else { "" };
    let _ = writeln!(out, "Daily challenge: {}/{}{}", challenge.progress, challenge.target, status);
    let _ = write!(out, "Session time: {}", duration(session_seconds));
    out
}

/// Every achievement with its status, then the latest unlocks
pub fn achievements(state: &ProgressState) -> String {
    let mut out = String::new();

    for achievement in &ACHIEVEMENTS {
        let mark = if state.achievements.contains_key(achievement.id) { "x" } else { " " };
        let _ = writeln!(
            out,
            "[{}] {} (+{}): {}",
            mark, achievement.title, achievement.points, achievement.description
        );
    }

    let recent = achievements::recent(state, 3);
    if !recent.is_empty() {
        let _ = writeln!(out, "\nRecently earned:");
        for (achievement, earned_at) in recent {
            let _ = writeln!(out, "  {} on {}", achievement.title, earned_at.format("%Y-%m-%d"));
        }
    }

    out.trim_end().to_string()
}

pub fn topics(subjects: &[&Subject], state: &ProgressState) -> String {
    let mut out = String::new();

    for subject in subjects {
        let _ = writeln!(out, "{}", subject.name);
        for topic in &subject.topics {
            let done = state.completed_in_topic(&topic.id);
            let pct = crate::progress::state::percentage(done, topic.total);
            let _ = writeln!(
                out,
                "  {:<12} {:<32} {:>3}/{:<3} {:>3}%",
                topic.id, topic.name, done, topic.total, pct
            );
        }
    }

    out.trim_end().to_string()
}

pub fn saved(cards: &[&SavedCard]) -> String {
    if cards.is_empty() {
        return "No saved cards".to_string();
    }

    let mut out = String::new();
    for card in cards {
        let _ = write!(
            out,
            "#{} {} card {} (saved {})",
            card.id,
            card.topic,
            card.card_index,
            card.saved_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(notes) = &card.notes {
            let _ = write!(out, ": {}", notes);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// The leaderboard, marking the current user
pub fn leaderboard(entries: &[LeaderboardEntry], current_user: &str) -> String {
    if entries.is_empty() {
        return "No learners yet".to_string();
    }

    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let marker = if entry.user_id == current_user { "*" } else { " " };
        let _ = writeln!(
            out,
            "{}{:>2}. {:<16} {:>6} pts  level {:<3} {}",
            marker,
            i + 1,
            entry.user_id,
            entry.points,
            entry.level,
            entry.rank
        );
    }
    out.trim_end().to_string()
}
