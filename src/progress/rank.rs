//! Rank titles by level band

/// A titled band of levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub min_level: u32,
    /// Inclusive; `u32::MAX` for the open-ended top band
    pub max_level: u32,
    pub title: &'static str,
    /// Material icon name
    pub icon: &'static str,
}

impl Rank {
    pub fn contains(&self, level: u32) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }
}

/// Ordered, non-overlapping bands covering level 1 upward
pub static RANKS: [Rank; 7] = [
    Rank { min_level: 1, max_level: 5, title: "Novice", icon: "emoji_events" },
    Rank { min_level: 6, max_level: 10, title: "Apprentice", icon: "psychology" },
    Rank { min_level: 11, max_level: 15, title: "Scholar", icon: "school" },
    Rank { min_level: 16, max_level: 20, title: "Master", icon: "workspace_premium" },
    Rank { min_level: 21, max_level: 25, title: "Expert", icon: "stars" },
    Rank { min_level: 26, max_level: 30, title: "Genius", icon: "auto_awesome" },
    Rank { min_level: 31, max_level: u32::MAX, title: "Physics Legend", icon: "rocket_launch" },
];

/// The band containing `level`, or the lowest band if none does
pub fn rank_for_level(level: u32) -> &'static Rank {
    RANKS.iter().find(|r| r.contains(level)).unwrap_or(&RANKS[0])
}

/// The band after the one containing `level`
pub fn next_rank(level: u32) -> Option<&'static Rank> {
    let current = RANKS.iter().position(|r| r.contains(level))?;
    RANKS.get(current + 1)
}
