//! Application state and command handling

pub mod command;
pub mod report;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::catalog::Identity;
use crate::config::Config;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::progress::{Clock, Event, ProgressEngine, SystemClock};
use crate::saved::SavedCards;
use crate::store::ProgressStore;
use command::Command;

/// The main application: one user's study session
pub struct App<S, C = SystemClock> {
    /// Application configuration
    config: Config,

    /// Who is studying and what they may see
    identity: Identity,

    /// Progress for the current user
    engine: ProgressEngine<S, C>,

    /// Bookmarked cards for every user
    saved: SavedCards,
    saved_path: PathBuf,

    /// When the session timer last advanced
    last_tick: Instant,
}

impl<S: ProgressStore, C: Clock> App<S, C> {
    /// Create a new application instance
    pub fn new(config: Config, identity: Identity, store: S, clock: C) -> Result<Self> {
        let saved_path = config.saved_cards_path()?;
        let saved = SavedCards::load_from(&saved_path)?;
        let engine = ProgressEngine::load(identity.user_id.clone(), store, clock, &config);

        Ok(Self { config, identity, engine, saved, saved_path, last_tick: Instant::now() })
    }

    /// Open the study session, returning any rewards it produced
    pub fn start(&mut self) -> String {
        self.last_tick = Instant::now();
        match self.engine.dispatch(Event::StartSession) {
            Ok(notes) => report::notifications(&notes),
            Err(e) => format!("error: {e}"),
        }
    }

    /// Run one command and return what to show the user
    pub fn execute(&mut self, command: Command) -> Result<String> {
        self.tick();

        match command {
            Command::Study { topic, indices } => self.study(&topic, &indices),
            Command::Stats => Ok(report::stats(
                self.engine.state(),
                self.engine.rules(),
                self.engine.session_seconds(),
            )),
            Command::Achievements => Ok(report::achievements(self.engine.state())),
            Command::Topics => {
                let subjects = self.config.catalog.accessible_subjects(&self.identity);
                Ok(report::topics(&subjects, self.engine.state()))
            }
            Command::Restart(topic) => {
                self.config.catalog.check_access(&self.identity, &topic)?;
                let notes = self.engine.dispatch(Event::RestartTopic { topic })?;
                Ok(report::notifications(&notes))
            }
            Command::Save { topic, index, note } => self.save_card(&topic, index, note),
            Command::Saved => Ok(report::saved(&self.saved.list(&self.identity.user_id))),
            Command::Unsave(id) => {
                let removed = self.saved.remove(&self.identity.user_id, id)?;
                self.saved.save_to(&self.saved_path)?;
                Ok(format!("Removed {} card {} from saved cards", removed.topic, removed.card_index))
            }
            Command::Leaderboard => {
                let entries = self.leaderboard()?;
                Ok(report::leaderboard(&entries, &self.identity.user_id))
            }
            Command::Help => Ok(report::HELP.to_string()),
            Command::Quit | Command::Nop => Ok(String::new()),
        }
    }

    fn study(&mut self, topic: &str, indices: &[u32]) -> Result<String> {
        self.config.catalog.check_access(&self.identity, topic)?;

        let mut lines = Vec::new();
        for &index in indices {
            let event = Event::CompleteCard { topic: topic.to_string(), index };
            match self.engine.dispatch(event) {
                Ok(notes) if notes.is_empty() => {
                    lines.push(format!("{} card {} already completed", topic, index));
                }
                Ok(notes) => lines.push(report::notifications(&notes)),
                Err(e) if e.is_invalid_input() => lines.push(format!("error: {e}")),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(lines.join("\n"))
    }

    fn save_card(&mut self, topic: &str, index: u32, note: Option<String>) -> Result<String> {
        self.config.catalog.check_access(&self.identity, topic)?;
        self.config.catalog.validate_card(topic, index)?;

        let user_id = &self.identity.user_id;
        if self.saved.is_saved(user_id, topic, index) {
            let id = self.saved.save(user_id, topic, index, note, self.engine.clock().now());
            return Ok(format!("Already saved as #{}", id));
        }

        let id = self.saved.save(user_id, topic, index, note, self.engine.clock().now());
        self.saved.save_to(&self.saved_path)?;
        tracing::debug!("Saved {} card {} for {}", topic, index, user_id);
        Ok(format!("Saved as #{} ({} saved)", id, self.saved.count(user_id)))
    }

    /// Stored users plus the current user's live state
    ///
    /// The current user's latest save may still be queued, so their entry is
    /// taken from memory.
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let user_id = &self.identity.user_id;
        let mut entries = leaderboard::leaderboard(self.engine.store(), usize::MAX)?;
        entries.retain(|e| &e.user_id != user_id);
        entries.push(LeaderboardEntry::new(user_id.clone(), self.engine.state()));
        Ok(leaderboard::ranked(entries, self.config.leaderboard_size))
    }

    fn tick(&mut self) {
        let elapsed = self.last_tick.elapsed().as_secs();
        if elapsed > 0 {
            self.engine.tick(elapsed);
            self.last_tick = Instant::now();
        }
    }
}

impl<S, C> App<S, C> {
    pub fn engine(&self) -> &ProgressEngine<S, C> {
        &self.engine
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Subject, Topic};
    use crate::progress::{FixedClock, ProgressError, ProgressState};
    use crate::store::{JsonFileStore, MemoryStore};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        store: MemoryStore,
        clock: FixedClock,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let config =
                Config { data_dir: Some(temp_dir.path().to_path_buf()), ..Config::default() };
            Self {
                _temp_dir: temp_dir,
                store: MemoryStore::new(),
                clock: FixedClock::on(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()),
                config,
            }
        }

        fn app(&self, user: &str) -> App<&MemoryStore, &FixedClock> {
            let identity = Identity::new(user, false, vec![1]);
            App::new(self.config.clone(), identity, &self.store, &self.clock).unwrap()
        }
    }

    fn study(topic: &str, indices: &[u32]) -> Command {
        Command::Study { topic: topic.to_string(), indices: indices.to_vec() }
    }

    #[test]
    fn start_extends_the_streak() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");

        app.start();

        assert_eq!(app.engine().state().streak, 1);
        assert_eq!(fixture.store.get("ada").unwrap().streak, 1);
    }

    #[test]
    fn study_reports_rewards_and_repeats() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");
        app.start();

        let first = app.execute(study("waves", &[0])).unwrap();
        assert!(first.contains("[points] +10 points"));
        assert!(first.contains("First Step"));

        let again = app.execute(study("waves", &[0])).unwrap();
        assert_eq!(again, "waves card 0 already completed");
    }

    #[test]
    fn study_reports_bad_indices_and_keeps_going() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");

        let text = app.execute(study("waves", &[99, 1])).unwrap();

        assert!(text.starts_with("error: Card 99 is out of range"));
        assert!(app.engine().state().is_completed(&crate::progress::CardId::new("waves", 1)));
    }

    #[test]
    fn study_outside_entitlement_is_denied() {
        let mut fixture = Fixture::new();
        fixture.config.catalog.subjects.push(Subject {
            id: 2,
            code: "2".into(),
            name: "A2 Physics".into(),
            topics: vec![Topic::new("fields", "Fields", 40)],
        });
        let mut app = fixture.app("ada");

        let err = app.execute(study("fields", &[0])).unwrap_err();

        assert_eq!(
            err.downcast_ref::<ProgressError>(),
            Some(&ProgressError::AccessDenied { topic: "fields".into() })
        );
        assert_eq!(app.engine().state().total_cards_completed, 0);
    }

    #[test]
    fn save_list_and_unsave() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");

        let saved = app
            .execute(Command::Save {
                topic: "photon".into(),
                index: 3,
                note: Some("work function".into()),
            })
            .unwrap();
        assert_eq!(saved, "Saved as #0 (1 saved)");

        let again = app
            .execute(Command::Save { topic: "photon".into(), index: 3, note: None })
            .unwrap();
        assert_eq!(again, "Already saved as #0");

        let list = app.execute(Command::Saved).unwrap();
        assert!(list.contains("#0 photon card 3"));
        assert!(list.ends_with(": work function"));

        // Another app instance sees the file
        let reopened = fixture.app("ada");
        assert_eq!(reopened.saved.count("ada"), 1);

        app.execute(Command::Unsave(0)).unwrap();
        assert_eq!(app.execute(Command::Saved).unwrap(), "No saved cards");
        assert!(app.execute(Command::Unsave(0)).is_err());
    }

    #[test]
    fn save_rejects_bad_cards() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");

        assert!(
            app.execute(Command::Save { topic: "waves".into(), index: 31, note: None }).is_err()
        );
        assert!(app.execute(Command::Save { topic: "optics".into(), index: 0, note: None }).is_err());
    }

    #[test]
    fn leaderboard_uses_live_state() {
        let fixture = Fixture::new();
        fixture.store.insert("bob", ProgressState { points: 15, ..ProgressState::default() });
        fixture.store.insert("ada", ProgressState { points: 1, ..ProgressState::default() });
        let mut app = fixture.app("ada");

        app.execute(study("mechanics", &[0])).unwrap();
        let text = app.execute(Command::Leaderboard).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // 1 + 10 for the card + 50 for First Step
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("* 1. ada"));
        assert!(lines[0].contains("61 pts"));
        assert!(lines[1].starts_with("  2. bob"));
    }

    #[test]
    fn leaderboard_lists_file_backed_users_once() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config { data_dir: Some(temp_dir.path().to_path_buf()), ..Config::default() };
        let store = JsonFileStore::new(config.progress_dir().unwrap());
        store.save("bob x", &ProgressState { points: 3, ..ProgressState::default() }).unwrap();
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
        let identity = Identity::new("sam@x.com", false, vec![1]);

        let mut app = App::new(config, identity, &store, &clock).unwrap();
        app.execute(study("waves", &[0])).unwrap();
        let text = app.execute(Command::Leaderboard).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(store.list_users().unwrap(), vec!["bob x".to_string(), "sam@x.com".to_string()]);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("* 1. sam@x.com"));
        assert!(lines[1].starts_with("  2. bob x"));
    }

    #[test]
    fn restart_resets_deck_position() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");

        app.execute(study("materials", &[8])).unwrap();
        let text = app.execute(Command::Restart("materials".into())).unwrap();

        assert_eq!(text, "[info] Deck restarted");
        assert_eq!(app.engine().state().deck_positions["materials"], 0);
    }

    #[test]
    fn topics_and_help_render() {
        let fixture = Fixture::new();
        let mut app = fixture.app("ada");

        assert!(app.execute(Command::Topics).unwrap().contains("Electricity"));
        assert!(app.execute(Command::Help).unwrap().starts_with("Commands:"));
        assert_eq!(app.execute(Command::Nop).unwrap(), "");
    }
}
