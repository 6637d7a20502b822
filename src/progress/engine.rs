//! The progress engine: study events in, state and notifications out
//!
//! The engine owns one user's [`ProgressState`] together with the store it is
//! persisted to and the clock that defines "today". Every public operation
//! returns the notifications it produced and saves the state afterwards. A
//! failed save is logged and retried with the next mutation; in-memory state is
//! never rolled back.

use super::achievements;
use super::clock::{Clock, SystemClock};
use super::error::ProgressError;
use super::event::{Event, Notification, NotificationKind};
use super::leveling::xp_threshold;
use super::rank::{Rank, rank_for_level};
use super::rules::{Rules, StreakTrigger};
use super::state::{CardId, ProgressState};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::store::ProgressStore;

/// One user's progress bound to its store and clock
#[derive(Debug)]
pub struct ProgressEngine<S, C = SystemClock> {
    user_id: String,
    state: ProgressState,
    rules: Rules,
    catalog: Catalog,
    streak_trigger: StreakTrigger,
    store: S,
    clock: C,
    /// Seconds on the session timer; not persisted
    session_seconds: u64,
    synced: bool,
}

impl<S: ProgressStore, C: Clock> ProgressEngine<S, C> {
    /// Load a user's progress, falling back to a fresh state if it cannot be read
    pub fn load(user_id: impl Into<String>, store: S, clock: C, config: &Config) -> Self {
        let user_id = user_id.into();
        let rules = config.rules.clone();

        let (mut state, synced) = match store.load(&user_id) {
            Ok(Some(state)) => (state, true),
            Ok(None) => {
                tracing::info!("No saved progress for {}, starting fresh", user_id);
                (ProgressState::new(&rules), true)
            }
            Err(e) => {
                tracing::warn!("Could not load progress for {}, starting fresh: {}", user_id, e);
                (ProgressState::new(&rules), false)
            }
        };
        state.normalize(&rules, &config.catalog);

        Self {
            user_id,
            state,
            rules,
            catalog: config.catalog.clone(),
            streak_trigger: config.streak_trigger,
            store,
            clock,
            session_seconds: 0,
            synced,
        }
    }

    /// Apply one study event
    pub fn dispatch(&mut self, event: Event) -> Result<Vec<Notification>, ProgressError> {
        match event {
            Event::StartSession => Ok(self.start_session()),
            Event::CompleteCard { topic, index } => self.complete_card(&topic, index),
            Event::RestartTopic { topic } => self.restart_topic(&topic),
            Event::Tick { seconds } => {
                self.tick(seconds);
                Ok(Vec::new())
            }
            Event::DailyReset => {
                self.check_daily_challenge();
                Ok(Vec::new())
            }
        }
    }

    /// Begin a study session
    pub fn start_session(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        let today = self.clock.today();

        self.state.refresh_day(today, &self.rules);
        self.state.stats.session_cards = 0;
        self.session_seconds = 0;

        if self.streak_trigger == StreakTrigger::SessionStart {
            self.state.extend_streak(today, &self.rules, &mut out);
        }

        self.settle(&mut out);
        out
    }

    /// Mark a card as completed
    ///
    /// Completing an already-completed card awards nothing. Unknown topics and
    /// out-of-range indices are rejected without touching state.
    pub fn complete_card(
        &mut self,
        topic: &str,
        index: u32,
    ) -> Result<Vec<Notification>, ProgressError> {
        let total = self.catalog.validate_card(topic, index)?.total;
        let mut out = Vec::new();
        let today = self.clock.today();

        self.state.refresh_day(today, &self.rules);
        let is_new = self.state.complete_card(CardId::new(topic, index), total, &self.rules, &mut out);

        if is_new && self.streak_trigger == StreakTrigger::CardCompletion {
            self.state.extend_streak(today, &self.rules, &mut out);
        }

        self.settle(&mut out);
        Ok(out)
    }

    /// Award points directly
    pub fn award_points(&mut self, amount: u64) -> Vec<Notification> {
        let mut out = Vec::new();
        let message = format!("+{} points", amount);
        self.state.award_points(amount, NotificationKind::Points, message, &self.rules, &mut out);
        self.settle(&mut out);
        out
    }

    /// Extend the streak if it has not been extended today
    pub fn update_streak(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        let today = self.clock.today();
        self.state.extend_streak(today, &self.rules, &mut out);
        self.settle(&mut out);
        out
    }

    /// Reset the daily challenge if it belongs to a previous day
    ///
    /// Returns true when a reset happened. Calling it again on the same day
    /// does nothing.
    pub fn check_daily_challenge(&mut self) -> bool {
        let reset = self.state.refresh_day(self.clock.today(), &self.rules);
        if reset {
            tracing::debug!("Daily challenge reset for {}", self.user_id);
            self.persist();
        }
        reset
    }

    /// Unlock any achievements whose conditions now hold
    pub fn evaluate_achievements(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        self.settle(&mut out);
        out
    }

    /// Send a deck back to its first card
    ///
    /// Completed cards and the streak are left alone.
    pub fn restart_topic(&mut self, topic: &str) -> Result<Vec<Notification>, ProgressError> {
        if self.catalog.topic(topic).is_none() {
            return Err(ProgressError::UnknownTopic(topic.to_string()));
        }

        self.state.deck_positions.insert(topic.to_string(), 0);
        self.persist();
        Ok(vec![Notification::new(NotificationKind::Info, "Deck restarted")])
    }

    /// Advance the session timer
    pub fn tick(&mut self, seconds: u64) {
        self.session_seconds = self.session_seconds.saturating_add(seconds);
    }

    fn settle(&mut self, out: &mut Vec<Notification>) {
        let now = self.clock.now();
        achievements::evaluate(&mut self.state, &self.catalog, &self.rules, now, out);
        self.persist();
    }

    fn persist(&mut self) {
        match self.store.save(&self.user_id, &self.state) {
            Ok(()) => {
                if !self.synced {
                    tracing::info!("Progress for {} is back in sync", self.user_id);
                }
                self.synced = true;
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Failed to save progress for {}, will retry: {}", self.user_id, e);
                self.synced = false;
            }
            Err(e) => {
                tracing::error!("Failed to save progress for {}: {}", self.user_id, e);
                self.synced = false;
            }
        }
    }
}

impl<S, C> ProgressEngine<S, C> {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether the last save reached the store
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Seconds elapsed in the current session
    pub fn session_seconds(&self) -> u64 {
        self.session_seconds
    }

    /// Current XP and the XP needed for the next level
    pub fn level_progress(&self) -> (u64, u64) {
        (self.state.xp, xp_threshold(self.state.level, &self.rules))
    }

    /// Rank band of the current level
    pub fn rank(&self) -> &'static Rank {
        rank_for_level(self.state.level)
    }
}
