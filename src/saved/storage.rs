//! Saved-card persistence

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SavedCard, SavedError};

/// All saved cards organized by user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCards {
    /// Saved cards per user (user_id -> cards in save order)
    pub users: BTreeMap<String, Vec<SavedCard>>,

    /// Id handed to the next saved card
    #[serde(default)]
    next_id: u64,
}

impl SavedCards {
    /// Load saved cards from a file, empty if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read saved cards from {:?}", path))?;
            let mut cards: Self =
                serde_json::from_str(&contents).with_context(|| "Failed to parse saved.json")?;
            cards.repair_next_id();
            Ok(cards)
        } else {
            Ok(Self::default())
        }
    }

    /// Save to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize saved cards")?;

        // One file holds every user's bookmarks; never leave it half-written
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write saved cards to {:?}", tmp))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace saved cards at {:?}", path))?;

        Ok(())
    }

    // A hand-edited file may carry ids at or above the stored counter
    fn repair_next_id(&mut self) {
        let max = self.users.values().flatten().map(|c| c.id).max();
        if let Some(max) = max {
            self.next_id = self.next_id.max(max + 1);
        }
    }

    /// Save a card for a user
    ///
    /// Saving the same card twice keeps the first entry and returns its id.
    pub fn save(
        &mut self,
        user_id: &str,
        topic: &str,
        card_index: u32,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        let cards = self.users.entry(user_id.to_string()).or_default();

        if let Some(existing) = cards.iter().find(|c| c.topic == topic && c.card_index == card_index)
        {
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        cards.push(SavedCard { id, topic: topic.to_string(), card_index, saved_at: now, notes });
        id
    }

    /// A user's saved cards, newest first
    pub fn list(&self, user_id: &str) -> Vec<&SavedCard> {
        let mut cards: Vec<&SavedCard> =
            self.users.get(user_id).map(|v| v.iter().collect()).unwrap_or_default();
        cards.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then(b.id.cmp(&a.id)));
        cards
    }

    /// Remove one of a user's saved cards
    pub fn remove(&mut self, user_id: &str, id: u64) -> Result<SavedCard, SavedError> {
        let cards = self.users.get_mut(user_id).ok_or(SavedError::NotFound(id))?;
        let pos = cards.iter().position(|c| c.id == id).ok_or(SavedError::NotFound(id))?;
        let removed = cards.remove(pos);

        if cards.is_empty() {
            self.users.remove(user_id);
        }
        Ok(removed)
    }

    pub fn is_saved(&self, user_id: &str, topic: &str, card_index: u32) -> bool {
        self.users
            .get(user_id)
            .is_some_and(|cards| cards.iter().any(|c| c.topic == topic && c.card_index == card_index))
    }

    /// Count a user's saved cards
    pub fn count(&self, user_id: &str) -> usize {
        self.users.get(user_id).map(|v| v.len()).unwrap_or(0)
    }
}
