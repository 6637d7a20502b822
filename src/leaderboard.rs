//! Ranking users by points

use serde::Serialize;

use crate::progress::ProgressState;
use crate::progress::rank::rank_for_level;
use crate::store::{ProgressStore, StoreError};

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub points: u64,
    pub level: u32,
    pub rank: &'static str,
}

impl LeaderboardEntry {
    pub fn new(user_id: impl Into<String>, state: &ProgressState) -> Self {
        Self {
            user_id: user_id.into(),
            points: state.points,
            level: state.level,
            rank: rank_for_level(state.level).title,
        }
    }
}

/// Top `limit` users by points, then level, then user id
///
/// Users whose progress cannot be read are left out.
pub fn leaderboard<S: ProgressStore>(
    store: &S,
    limit: usize,
) -> Result<Vec<LeaderboardEntry>, StoreError> {
    let mut entries = Vec::new();

    for user_id in store.list_users()? {
        match store.load(&user_id) {
            Ok(Some(state)) => entries.push(LeaderboardEntry::new(user_id, &state)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping {} on the leaderboard: {}", user_id, e),
        }
    }

    Ok(ranked(entries, limit))
}

/// Sort entries into leaderboard order and keep the first `limit`
pub fn ranked(mut entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.points.cmp(&a.points).then(b.level.cmp(&a.level)).then(a.user_id.cmp(&b.user_id))
    });
    entries.truncate(limit);
    entries
}
