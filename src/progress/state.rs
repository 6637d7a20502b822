//! Per-user progress state
//!
//! Everything in here is plain data plus the pure transitions over it. Nothing
//! touches the clock or the store; callers pass "today" in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::{Notification, NotificationKind};
use super::leveling::settle_levels;
use super::rules::Rules;
use crate::catalog::Catalog;

/// One flashcard: a topic plus a zero-based index into its deck
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardId {
    pub topic: String,
    pub index: u32,
}

impl CardId {
    pub fn new(topic: impl Into<String>, index: u32) -> Self {
        Self { topic: topic.into(), index }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.topic, self.index)
    }
}

/// A card key that is not `<topic>_<index>`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid card key '{0}', expected <topic>_<index>")]
pub struct ParseCardIdError(String);

impl FromStr for CardId {
    type Err = ParseCardIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Topics may contain underscores, indices never do
        let (topic, index) = s.rsplit_once('_').ok_or_else(|| ParseCardIdError(s.to_string()))?;
        if topic.is_empty() {
            return Err(ParseCardIdError(s.to_string()));
        }
        let index = index.parse().map_err(|_| ParseCardIdError(s.to_string()))?;
        Ok(Self { topic: topic.to_string(), index })
    }
}

/// Completion of one topic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicProgress {
    pub completed: u32,
    pub total: u32,
    /// Whole percent, 0-100
    pub percentage: u8,
}

impl TopicProgress {
    pub fn new(completed: u32, total: u32) -> Self {
        Self { completed, total, percentage: percentage(completed, total) }
    }

    /// Every card in the topic has been completed
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

/// Rounded completion percentage, capped at 100
pub fn percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(completed) / f64::from(total) * 100.0).round();
    pct.min(100.0) as u8
}

/// Today's card-count challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyChallenge {
    pub completed: bool,
    pub target: u32,
    pub progress: u32,
    /// Day this record belongs to; anything other than today is stale
    #[serde(with = "lenient_date")]
    pub last_date: Option<NaiveDate>,
}

impl Default for DailyChallenge {
    fn default() -> Self {
        Self { completed: false, target: Rules::default().daily_target, progress: 0, last_date: None }
    }
}

impl DailyChallenge {
    /// A fresh, open challenge for the given day
    pub fn fresh(target: u32, today: NaiveDate) -> Self {
        Self { completed: false, target, progress: 0, last_date: Some(today) }
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.last_date == Some(today)
    }
}

/// When an achievement was earned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub earned_at: DateTime<Utc>,
}

/// Counters the achievement rules look at
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudyStats {
    /// New completions since midnight
    pub cards_today: u32,
    /// New completions since the current session started
    pub session_cards: u32,
    /// Daily challenges finished, all time
    pub challenges_completed: u32,
    /// Session card counts at which a milestone was reached, all time
    pub session_milestones: Vec<u32>,
}

/// All gamification progress for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressState {
    pub points: u64,
    /// Progress toward the next level
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub total_cards_completed: u32,
    #[serde(with = "card_set")]
    pub completed_cards: BTreeSet<CardId>,
    pub topic_progress: BTreeMap<String, TopicProgress>,
    pub daily_challenge: DailyChallenge,
    pub achievements: BTreeMap<String, AchievementRecord>,
    /// Day the streak was last extended
    #[serde(with = "lenient_date")]
    pub last_streak_date: Option<NaiveDate>,
    /// Last card index reached per topic
    pub deck_positions: BTreeMap<String, u32>,
    pub stats: StudyStats,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(&Rules::default())
    }
}

impl ProgressState {
    /// Fresh state for a new user
    pub fn new(rules: &Rules) -> Self {
        Self {
            points: 0,
            xp: 0,
            level: 1,
            streak: 0,
            total_cards_completed: 0,
            completed_cards: BTreeSet::new(),
            topic_progress: BTreeMap::new(),
            daily_challenge: DailyChallenge { target: rules.daily_target, ..Default::default() },
            achievements: BTreeMap::new(),
            last_streak_date: None,
            deck_positions: BTreeMap::new(),
            stats: StudyStats::default(),
        }
    }

    /// Repair derived fields after loading
    ///
    /// Topic totals come from the catalog where it knows the topic; entries for
    /// topics it does not know keep their stored total.
    pub fn normalize(&mut self, rules: &Rules, catalog: &Catalog) {
        self.level = self.level.max(1);
        self.total_cards_completed = self.completed_cards.len() as u32;

        let mut topics: BTreeSet<String> = self.topic_progress.keys().cloned().collect();
        topics.extend(self.completed_cards.iter().map(|c| c.topic.clone()));

        for topic in topics {
            let stored = self.topic_progress.get(&topic).map(|p| p.total);
            let Some(total) = catalog.topic(&topic).map(|t| t.total).or(stored) else {
                continue;
            };
            let completed = self.completed_in_topic(&topic);
            self.topic_progress.insert(topic, TopicProgress::new(completed, total));
        }

        if self.daily_challenge.target == 0 {
            self.daily_challenge.target = rules.daily_target;
        }
        if self.daily_challenge.completed {
            self.daily_challenge.progress =
                self.daily_challenge.progress.min(self.daily_challenge.target);
        }

        let mut discarded = Vec::new();
        settle_levels(&mut self.level, &mut self.xp, rules, &mut discarded);
    }

    pub fn is_completed(&self, card: &CardId) -> bool {
        self.completed_cards.contains(card)
    }

    /// Number of completed cards in one topic
    pub fn completed_in_topic(&self, topic: &str) -> u32 {
        self.completed_cards.iter().filter(|c| c.topic == topic).count() as u32
    }

    /// Add points and half as much XP, then settle any level-ups
    pub fn award_points(
        &mut self,
        amount: u64,
        kind: NotificationKind,
        message: impl Into<String>,
        rules: &Rules,
        out: &mut Vec<Notification>,
    ) {
        self.points = self.points.saturating_add(amount);
        self.xp = self.xp.saturating_add(amount / 2);
        out.push(Notification::with_amount(kind, message, amount));
        settle_levels(&mut self.level, &mut self.xp, rules, out);
    }

    /// Reset the daily challenge and day counters if they belong to another day
    ///
    /// Returns true when a reset happened.
    pub fn refresh_day(&mut self, today: NaiveDate, rules: &Rules) -> bool {
        if self.daily_challenge.is_current(today) {
            return false;
        }
        self.daily_challenge = DailyChallenge::fresh(rules.daily_target, today);
        self.stats.cards_today = 0;
        true
    }

    /// Extend the streak by one if it has not been extended today
    ///
    /// Pays `streak * multiplier` bonus points whenever the streak lands on a
    /// multiple of the bonus interval. Returns true when the streak grew.
    pub fn extend_streak(
        &mut self,
        today: NaiveDate,
        rules: &Rules,
        out: &mut Vec<Notification>,
    ) -> bool {
        if self.last_streak_date == Some(today) {
            return false;
        }
        self.streak = self.streak.saturating_add(1);
        self.last_streak_date = Some(today);

        if rules.streak_bonus_interval > 0 && self.streak % rules.streak_bonus_interval == 0 {
            let bonus = u64::from(self.streak).saturating_mul(rules.streak_bonus_multiplier);
            let message = format!("{} day streak! +{} bonus points", self.streak, bonus);
            self.award_points(bonus, NotificationKind::Streak, message, rules, out);
        }
        true
    }

    /// Record a first-time card completion
    ///
    /// `topic_total` is the deck size of the card's topic. Does nothing and
    /// returns false when the card was already completed.
    pub fn complete_card(
        &mut self,
        card: CardId,
        topic_total: u32,
        rules: &Rules,
        out: &mut Vec<Notification>,
    ) -> bool {
        let topic = card.topic.clone();
        let index = card.index;
        self.deck_positions.insert(topic.clone(), index);

        if !self.completed_cards.insert(card) {
            return false;
        }
        self.total_cards_completed = self.completed_cards.len() as u32;

        let completed = self.completed_in_topic(&topic);
        self.topic_progress.insert(topic, TopicProgress::new(completed, topic_total));

        self.advance_daily_challenge(rules, out);
        self.award_points(
            rules.card_points,
            NotificationKind::Points,
            format!("+{} points", rules.card_points),
            rules,
            out,
        );
        self.record_session_card(rules, out);
        true
    }

    fn advance_daily_challenge(&mut self, rules: &Rules, out: &mut Vec<Notification>) {
        let challenge = &mut self.daily_challenge;
        if challenge.completed {
            return;
        }
        challenge.progress += 1;
        if challenge.progress < challenge.target {
            return;
        }
        challenge.completed = true;
        self.stats.challenges_completed += 1;

        let bonus = rules.challenge_bonus;
        let message = format!("Daily Challenge Completed! +{} points", bonus);
        self.award_points(bonus, NotificationKind::Challenge, message, rules, out);
    }

    fn record_session_card(&mut self, rules: &Rules, out: &mut Vec<Notification>) {
        self.stats.cards_today += 1;
        self.stats.session_cards += 1;

        let interval = rules.session_milestone_interval;
        if interval > 0 && self.stats.session_cards % interval == 0 {
            let count = self.stats.session_cards;
            self.stats.session_milestones.push(count);
            out.push(Notification::with_amount(
                NotificationKind::Milestone,
                format!("Session milestone: {} cards this session", count),
                u64::from(count),
            ));
        }
    }
}

/// `completedCards` is stored as `{ "<topic>_<index>": true }`
mod card_set {
    use std::collections::{BTreeMap, BTreeSet};

    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::CardId;

    pub fn serialize<S: Serializer>(cards: &BTreeSet<CardId>, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(cards.len()))?;
        for card in cards {
            map.serialize_entry(&card.to_string(), &true)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<CardId>, D::Error> {
        let raw = BTreeMap::<String, bool>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .filter(|(_, done)| *done)
            .filter_map(|(key, _)| match key.parse() {
                Ok(card) => Some(card),
                Err(e) => {
                    tracing::warn!("Skipping completed card: {}", e);
                    None
                }
            })
            .collect())
    }
}

/// Dates that tolerate `""` and junk by reading them as "never"
mod lenient_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        date.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn card_id_round_trips_through_its_key() {
        let card = CardId::new("mechanics", 7);
        assert_eq!(card.to_string(), "mechanics_7");
        assert_eq!("mechanics_7".parse::<CardId>().unwrap(), card);
    }

    #[test]
    fn card_id_splits_on_last_underscore() {
        let card: CardId = "thermal_physics_12".parse().unwrap();
        assert_eq!(card.topic, "thermal_physics");
        assert_eq!(card.index, 12);
    }

    #[test]
    fn card_id_rejects_bad_keys() {
        assert!("mechanics".parse::<CardId>().is_err());
        assert!("_3".parse::<CardId>().is_err());
        assert!("waves_x".parse::<CardId>().is_err());
    }

    #[test]
    fn percentage_rounds_and_caps() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(60, 51), 100);
    }

    #[test]
    fn new_state_starts_at_level_one() {
        let state = ProgressState::default();
        assert_eq!(state.level, 1);
        assert_eq!(state.daily_challenge.target, 10);
        assert!(state.daily_challenge.last_date.is_none());
    }

    #[test]
    fn award_points_adds_half_as_xp() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        let mut out = Vec::new();

        for _ in 0..5 {
            state.award_points(10, NotificationKind::Points, "+10 points", &rules, &mut out);
        }

        assert_eq!(state.points, 50);
        assert_eq!(state.xp, 25);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn big_award_levels_up_with_carry() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        let mut out = Vec::new();

        state.award_points(250, NotificationKind::Points, "+250 points", &rules, &mut out);

        assert_eq!(state.points, 250);
        assert_eq!(state.level, 2);
        assert_eq!(state.xp, 25);
        assert!(out.iter().any(|n| n.kind == NotificationKind::LevelUp));
    }

    #[test]
    fn completing_a_card_twice_counts_once() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        state.refresh_day(day(1), &rules);
        let mut out = Vec::new();

        assert!(state.complete_card(CardId::new("waves", 0), 31, &rules, &mut out));
        let after_first = state.clone();
        assert!(!state.complete_card(CardId::new("waves", 0), 31, &rules, &mut out));

        assert_eq!(state, after_first);
        assert_eq!(state.total_cards_completed, 1);
        assert_eq!(state.points, 10);
    }

    #[test]
    fn topic_progress_tracks_completions() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        let mut out = Vec::new();

        state.complete_card(CardId::new("photon", 0), 4, &rules, &mut out);
        state.complete_card(CardId::new("photon", 1), 4, &rules, &mut out);

        assert_eq!(state.topic_progress["photon"], TopicProgress::new(2, 4));
        assert_eq!(state.topic_progress["photon"].percentage, 50);
        assert_eq!(state.deck_positions["photon"], 1);
    }

    #[test]
    fn daily_challenge_stops_at_target() {
        let rules = Rules { daily_target: 2, ..Rules::default() };
        let mut state = ProgressState::new(&rules);
        state.refresh_day(day(1), &rules);
        let mut out = Vec::new();

        for i in 0..4 {
            state.complete_card(CardId::new("waves", i), 31, &rules, &mut out);
        }

        assert!(state.daily_challenge.completed);
        assert_eq!(state.daily_challenge.progress, 2);
        assert_eq!(state.stats.challenges_completed, 1);
        let bonuses = out.iter().filter(|n| n.kind == NotificationKind::Challenge).count();
        assert_eq!(bonuses, 1);
    }

    #[test]
    fn refresh_day_resets_only_stale_records() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);

        assert!(state.refresh_day(day(1), &rules));
        state.daily_challenge.progress = 4;
        state.stats.cards_today = 4;

        assert!(!state.refresh_day(day(1), &rules));
        assert_eq!(state.daily_challenge.progress, 4);

        assert!(state.refresh_day(day(2), &rules));
        assert_eq!(state.daily_challenge, DailyChallenge::fresh(10, day(2)));
        assert_eq!(state.stats.cards_today, 0);
    }

    #[test]
    fn streak_grows_once_per_day() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        let mut out = Vec::new();

        assert!(state.extend_streak(day(1), &rules, &mut out));
        assert!(!state.extend_streak(day(1), &rules, &mut out));
        assert_eq!(state.streak, 1);

        assert!(state.extend_streak(day(2), &rules, &mut out));
        assert_eq!(state.streak, 2);
    }

    #[test]
    fn fifth_streak_day_pays_a_bonus() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        let mut out = Vec::new();

        for d in 1..=5 {
            state.extend_streak(day(d), &rules, &mut out);
        }

        assert_eq!(state.streak, 5);
        assert_eq!(state.points, 10);
        let streak_note = out.iter().find(|n| n.kind == NotificationKind::Streak).unwrap();
        assert_eq!(streak_note.message, "5 day streak! +10 bonus points");
        assert_eq!(streak_note.amount, Some(10));
    }

    #[test]
    fn session_milestones_accumulate() {
        let rules = Rules { session_milestone_interval: 2, ..Rules::default() };
        let mut state = ProgressState::new(&rules);
        let mut out = Vec::new();

        for i in 0..5 {
            state.complete_card(CardId::new("materials", i), 74, &rules, &mut out);
        }

        assert_eq!(state.stats.session_milestones, vec![2, 4]);
    }

    #[test]
    fn serializes_in_wire_shape() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        state.refresh_day(day(3), &rules);
        let mut out = Vec::new();
        state.complete_card(CardId::new("mechanics", 2), 51, &rules, &mut out);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["completedCards"]["mechanics_2"], true);
        assert_eq!(json["totalCardsCompleted"], 1);
        assert_eq!(json["dailyChallenge"]["lastDate"], "2024-05-03");
        assert_eq!(json["topicProgress"]["mechanics"]["total"], 51);
    }

    #[test]
    fn tolerates_legacy_and_partial_json() {
        let json = r#"{
            "points": 40,
            "completedCards": { "waves_1": true, "waves_2": false, "garbage": true },
            "dailyChallenge": { "completed": false, "target": 10, "progress": 3, "lastDate": "" }
        }"#;

        let mut state: ProgressState = serde_json::from_str(json).unwrap();
        state.normalize(&Rules::default(), &Catalog::default());

        assert_eq!(state.points, 40);
        assert_eq!(state.level, 1);
        assert_eq!(state.total_cards_completed, 1);
        assert!(state.daily_challenge.last_date.is_none());
    }

    #[test]
    fn normalize_settles_pending_levels() {
        let rules = Rules::default();
        let mut state = ProgressState { level: 0, xp: 130, ..ProgressState::new(&rules) };

        state.normalize(&rules, &Catalog::default());

        assert_eq!(state.level, 2);
        assert_eq!(state.xp, 30);
    }

    #[test]
    fn normalize_seeds_missing_topic_progress() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        state.completed_cards.insert(CardId::new("waves", 0));
        state.completed_cards.insert(CardId::new("waves", 5));
        state.completed_cards.insert(CardId::new("retired", 1));
        state.topic_progress.insert("photon".into(), TopicProgress::new(9, 36));
        state.topic_progress.insert("legacy".into(), TopicProgress::new(3, 12));

        state.normalize(&rules, &Catalog::default());

        assert_eq!(state.topic_progress["waves"], TopicProgress::new(2, 31));
        assert_eq!(state.topic_progress["photon"], TopicProgress::new(0, 36));
        assert_eq!(state.topic_progress["legacy"], TopicProgress::new(0, 12));
        // No stored or catalog total to work from
        assert!(!state.topic_progress.contains_key("retired"));
        assert_eq!(state.total_cards_completed, 3);
    }

    #[test]
    fn normalize_clamps_completed_challenge_progress() {
        let rules = Rules::default();
        let mut state = ProgressState::new(&rules);
        state.daily_challenge.completed = true;
        state.daily_challenge.progress = 14;

        state.normalize(&rules, &Catalog::default());

        assert_eq!(state.daily_challenge.progress, 10);
        assert!(state.daily_challenge.completed);
    }
}
