//! One JSON file per user

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{ProgressStore, StoreError};
use crate::progress::ProgressState;

/// Stores each user's progress as `<dir>/<user>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the per-user files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a user's progress file
    pub fn user_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(user_id)))
    }
}

/// Map a user id onto a file name stem
///
/// Percent-encoding keeps the mapping one-to-one, so distinct ids never share a
/// file and [`user_id_from_stem`] recovers the id. A leading dot is encoded too
/// so no user becomes a hidden file.
fn file_stem(user_id: &str) -> String {
    let encoded = urlencoding::encode(user_id);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded.into_owned(),
    }
}

fn user_id_from_stem(stem: &str) -> Option<String> {
    match urlencoding::decode(stem) {
        Ok(id) => Some(id.into_owned()),
        Err(e) => {
            tracing::warn!("Ignoring progress file {:?}: {}", stem, e);
            None
        }
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self, user_id: &str) -> Result<Option<ProgressState>, StoreError> {
        let path = self.user_path(user_id);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_str(&contents)?;
        tracing::debug!("Loaded progress for {} from {:?}", user_id, path);
        Ok(Some(state))
    }

    fn save(&self, user_id: &str, state: &ProgressState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.user_path(user_id);
        let contents = serde_json::to_string_pretty(state)?;

        // Write then rename so a crash never leaves a half-written file behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!("Saved progress for {} to {:?}", user_id, path);
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users: Vec<String> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .filter_map(|name| name.strip_suffix(".json").and_then(user_id_from_stem))
            .collect();

        users.sort();
        Ok(users)
    }
}
