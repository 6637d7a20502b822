//! Subjects, their flashcard topics, and who may study them

use serde::{Deserialize, Serialize};

use crate::progress::ProgressError;

/// A flashcard deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Stable identifier used in card keys (e.g. "mechanics")
    pub id: String,
    /// Display name
    pub name: String,
    /// Number of cards in the deck
    pub total: u32,
}

impl Topic {
    pub fn new(id: &str, name: &str, total: u32) -> Self {
        Self { id: id.to_string(), name: name.to_string(), total }
    }
}

/// A course that groups topics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: u32,
    pub code: String,
    pub name: String,
    pub topics: Vec<Topic>,
}

/// Identity context attached to a request by the auth layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub is_admin: bool,
    /// Subjects this user is entitled to
    pub subject_ids: Vec<u32>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, is_admin: bool, subject_ids: Vec<u32>) -> Self {
        Self { user_id: user_id.into(), is_admin, subject_ids }
    }
}

/// Every subject the application knows about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub subjects: Vec<Subject>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            subjects: vec![Subject {
                id: 1,
                code: "1".to_string(),
                name: "AS Physics".to_string(),
                topics: vec![
                    Topic::new("mechanics", "Mechanics", 51),
                    Topic::new("materials", "Materials", 74),
                    Topic::new("electricity", "Electricity", 35),
                    Topic::new("waves", "Waves", 31),
                    Topic::new("photon", "Photon", 36),
                ],
            }],
        }
    }
}

impl Catalog {
    /// Find a topic in any subject
    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.all_topics().find(|t| t.id == id)
    }

    /// Subject that owns a topic
    pub fn subject_of(&self, topic_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.topics.iter().any(|t| t.id == topic_id))
    }

    /// Every topic across all subjects
    pub fn all_topics(&self) -> impl Iterator<Item = &Topic> {
        self.subjects.iter().flat_map(|s| s.topics.iter())
    }

    /// Subjects the identity may study
    ///
    /// Admins see everything. A user with no matching entitlement falls back to
    /// the first subject so the app is never empty.
    pub fn accessible_subjects(&self, identity: &Identity) -> Vec<&Subject> {
        if identity.is_admin {
            return self.subjects.iter().collect();
        }

        let entitled: Vec<&Subject> =
            self.subjects.iter().filter(|s| identity.subject_ids.contains(&s.id)).collect();

        if entitled.is_empty() { self.subjects.first().into_iter().collect() } else { entitled }
    }

    /// Ensure the identity may study a topic
    pub fn check_access(&self, identity: &Identity, topic_id: &str) -> Result<(), ProgressError> {
        let subject = self
            .subject_of(topic_id)
            .ok_or_else(|| ProgressError::UnknownTopic(topic_id.to_string()))?;

        if self.accessible_subjects(identity).iter().any(|s| s.id == subject.id) {
            Ok(())
        } else {
            Err(ProgressError::AccessDenied { topic: topic_id.to_string() })
        }
    }

    /// Resolve a card reference to its deck, rejecting unknown topics and bad indices
    pub fn validate_card(&self, topic_id: &str, index: u32) -> Result<&Topic, ProgressError> {
        let topic =
            self.topic(topic_id).ok_or_else(|| ProgressError::UnknownTopic(topic_id.to_string()))?;

        if index >= topic.total {
            return Err(ProgressError::CardOutOfRange {
                topic: topic_id.to_string(),
                index,
                total: topic.total,
            });
        }
        Ok(topic)
    }
}
