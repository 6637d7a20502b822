//! One-time achievements and their unlock rules

use chrono::{DateTime, Utc};

use super::event::{Notification, NotificationKind};
use super::rules::Rules;
use super::state::{AchievementRecord, ProgressState};
use crate::catalog::Catalog;

/// An achievement and the condition that unlocks it
#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    /// Unique identifier, used as the key in saved state
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Points paid out on unlock
    pub points: u64,
    /// Material icon name
    pub icon: &'static str,
    condition: fn(&ProgressState, &Catalog) -> bool,
}

impl Achievement {
    /// Whether the unlock condition holds for this state
    pub fn is_met(&self, state: &ProgressState, catalog: &Catalog) -> bool {
        (self.condition)(state, catalog)
    }
}

/// Every achievement, in display order
pub static ACHIEVEMENTS: [Achievement; 12] = [
    Achievement {
        id: "first_card",
        title: "First Step",
        description: "Review your first flashcard",
        points: 50,
        icon: "school",
        condition: |s, _| s.total_cards_completed >= 1,
    },
    Achievement {
        id: "fast_learner",
        title: "Fast Learner",
        description: "Review 10 cards in one day",
        points: 100,
        icon: "speed",
        condition: |s, _| s.stats.cards_today >= 10,
    },
    Achievement {
        id: "topic_master",
        title: "Topic Master",
        description: "Complete an entire topic",
        points: 200,
        icon: "workspace_premium",
        condition: |s, _| s.topic_progress.values().any(|t| t.is_complete()),
    },
    Achievement {
        id: "perfect_week",
        title: "Perfect Week",
        description: "Maintain a 7-day streak",
        points: 500,
        icon: "calendar_month",
        condition: |s, _| s.streak >= 7,
    },
    Achievement {
        id: "physics_enthusiast",
        title: "Physics Enthusiast",
        description: "Review at least one card for 30 consecutive days",
        points: 1000,
        icon: "auto_awesome",
        condition: |s, _| s.streak >= 30,
    },
    Achievement {
        id: "knowledge_explorer",
        title: "Knowledge Explorer",
        description: "Review cards from all available topics",
        points: 150,
        icon: "travel_explore",
        condition: covers_every_topic,
    },
    Achievement {
        id: "daily_devotion",
        title: "Daily Devotion",
        description: "Complete 5 daily challenges",
        points: 250,
        icon: "assignment_turned_in",
        condition: |s, _| s.stats.challenges_completed >= 5,
    },
    Achievement {
        id: "review_master",
        title: "Review Master",
        description: "Review 100 cards in total",
        points: 300,
        icon: "military_tech",
        condition: |s, _| s.total_cards_completed >= 100,
    },
    Achievement {
        id: "quick_learner",
        title: "Quick Learner",
        description: "Review 20 cards in a single session",
        points: 200,
        icon: "bolt",
        condition: |s, _| s.stats.session_cards >= 20,
    },
    Achievement {
        id: "milestone_master",
        title: "Milestone Master",
        description: "Reach 3 session milestones",
        points: 150,
        icon: "flag",
        condition: |s, _| s.stats.session_milestones.len() >= 3,
    },
    Achievement {
        id: "dedicated_student",
        title: "Dedicated Student",
        description: "Reach level 5",
        points: 250,
        icon: "psychology",
        condition: |s, _| s.level >= 5,
    },
    Achievement {
        id: "physics_scholar",
        title: "Physics Scholar",
        description: "Reach level 10",
        points: 500,
        icon: "school",
        condition: |s, _| s.level >= 10,
    },
];

fn covers_every_topic(state: &ProgressState, catalog: &Catalog) -> bool {
    let mut topics = catalog.all_topics().peekable();
    if topics.peek().is_none() {
        return false;
    }
    topics.all(|t| state.topic_progress.get(&t.id).is_some_and(|p| p.completed > 0))
}

/// Look up an achievement by id
pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Unlock every achievement whose condition now holds
///
/// Rewards go through the normal point path, so an unlock can cause a level-up
/// that satisfies a level achievement; evaluation repeats until nothing new
/// unlocks. Earned entries are never removed.
pub fn evaluate(
    state: &mut ProgressState,
    catalog: &Catalog,
    rules: &Rules,
    now: DateTime<Utc>,
    out: &mut Vec<Notification>,
) -> Vec<&'static str> {
    let mut unlocked = Vec::new();

    loop {
        let ready: Vec<&'static Achievement> = ACHIEVEMENTS
            .iter()
            .filter(|a| !state.achievements.contains_key(a.id) && a.is_met(state, catalog))
            .collect();

        if ready.is_empty() {
            break;
        }

        for achievement in ready {
            state.achievements.insert(achievement.id.to_string(), AchievementRecord { earned_at: now });
            tracing::info!("Achievement unlocked: {}", achievement.title);

            let message =
                format!("Achievement unlocked: {} +{} points", achievement.title, achievement.points);
            state.award_points(achievement.points, NotificationKind::Achievement, message, rules, out);
            unlocked.push(achievement.id);
        }
    }

    unlocked
}

/// The most recently earned achievements, newest first
pub fn recent(state: &ProgressState, limit: usize) -> Vec<(&'static Achievement, DateTime<Utc>)> {
    let mut earned: Vec<_> = state
        .achievements
        .iter()
        .filter_map(|(id, record)| find(id).map(|a| (a, record.earned_at)))
        .collect();

    earned.sort_by(|a, b| b.1.cmp(&a.1));
    earned.truncate(limit);
    earned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::state::TopicProgress;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn nothing_unlocks_on_empty_state() {
        let mut state = ProgressState::default();
        let mut out = Vec::new();

        let unlocked =
            evaluate(&mut state, &Catalog::default(), &Rules::default(), now(), &mut out);

        assert!(unlocked.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn first_card_unlocks_and_pays() {
        let mut state = ProgressState { total_cards_completed: 1, ..ProgressState::default() };
        let mut out = Vec::new();

        let unlocked =
            evaluate(&mut state, &Catalog::default(), &Rules::default(), now(), &mut out);

        assert_eq!(unlocked, vec!["first_card"]);
        assert_eq!(state.points, 50);
        assert_eq!(state.achievements["first_card"].earned_at, now());
        assert_eq!(out[0].kind, NotificationKind::Achievement);
    }

    #[test]
    fn achievements_unlock_only_once() {
        let mut state = ProgressState { total_cards_completed: 1, ..ProgressState::default() };
        let catalog = Catalog::default();
        let rules = Rules::default();
        let mut out = Vec::new();

        evaluate(&mut state, &catalog, &rules, now(), &mut out);
        let points = state.points;
        let again = evaluate(&mut state, &catalog, &rules, now(), &mut out);

        assert!(again.is_empty());
        assert_eq!(state.points, points);
    }

    #[test]
    fn reward_level_up_chains_into_level_achievement() {
        // Level 4 with enough XP that the streak reward (+250 XP) crosses level 5
        let mut state = ProgressState { level: 4, xp: 300, streak: 7, ..ProgressState::default() };
        let mut out = Vec::new();

        let unlocked =
            evaluate(&mut state, &Catalog::default(), &Rules::default(), now(), &mut out);

        assert!(unlocked.contains(&"perfect_week"));
        assert!(unlocked.contains(&"dedicated_student"));
        assert!(state.level >= 5);
    }

    #[test]
    fn explorer_needs_every_catalog_topic() {
        let catalog = Catalog::default();
        let mut state = ProgressState::default();
        for topic in ["mechanics", "materials", "electricity", "waves"] {
            state.topic_progress.insert(topic.into(), TopicProgress::new(1, 10));
        }
        assert!(!covers_every_topic(&state, &catalog));

        state.topic_progress.insert("photon".into(), TopicProgress::new(1, 36));
        assert!(covers_every_topic(&state, &catalog));

        assert!(!covers_every_topic(&state, &Catalog { subjects: vec![] }));
    }

    #[test]
    fn topic_master_needs_a_full_deck() {
        let master = find("topic_master").unwrap();
        let catalog = Catalog::default();
        let mut state = ProgressState::default();

        state.topic_progress.insert("waves".into(), TopicProgress::new(30, 31));
        assert!(!master.is_met(&state, &catalog));

        state.topic_progress.insert("waves".into(), TopicProgress::new(31, 31));
        assert!(master.is_met(&state, &catalog));
    }

    #[test]
    fn recent_is_newest_first() {
        let mut state = ProgressState::default();
        let earlier = now() - chrono::Duration::days(1);
        state.achievements.insert("first_card".into(), AchievementRecord { earned_at: earlier });
        state.achievements.insert("perfect_week".into(), AchievementRecord { earned_at: now() });
        state.achievements.insert("retired_badge".into(), AchievementRecord { earned_at: now() });

        let latest = recent(&state, 3);

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].0.id, "perfect_week");
        assert_eq!(latest[1].0.id, "first_card");
    }
}
