use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::error::StoreError;
use crate::models::ProjectKey;

use super::write_atomic;

/// Process-wide record shared by every project on this machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub trusted_projects: BTreeSet<ProjectKey>,
    /// Projects whose reset no longer asks for confirmation
    #[serde(default)]
    pub skip_reset_confirmation: BTreeSet<ProjectKey>,
}

/// File-backed [`AppState`]; every mutation is written through immediately.
pub struct AppStateStore {
    path: PathBuf,
    state: Mutex<AppState>,
}

impl AppStateStore {
    /// `<config_dir>/terminal-manager/state.json`
    pub fn open() -> Result<Self, StoreError> {
        let dir = dirs::config_dir()
            .ok_or(StoreError::ConfigDirNotFound)?
            .join("terminal-manager");
        Ok(Self::open_at(dir.join("state.json")))
    }

    pub fn open_at(path: PathBuf) -> Self {
        let state = load_state(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    pub fn is_trusted(&self, key: &ProjectKey) -> bool {
        self.lock().trusted_projects.contains(key)
    }

    pub fn set_trusted(&self, key: &ProjectKey, trusted: bool) -> Result<(), StoreError> {
        self.update(|state| {
            if trusted {
                state.trusted_projects.insert(key.clone());
            } else {
                state.trusted_projects.remove(key);
            }
        })
    }

    pub fn skip_reset_confirmation(&self, key: &ProjectKey) -> bool {
        self.lock().skip_reset_confirmation.contains(key)
    }

    pub fn set_skip_reset_confirmation(&self, key: &ProjectKey, skip: bool) -> Result<(), StoreError> {
        self.update(|state| {
            if skip {
                state.skip_reset_confirmation.insert(key.clone());
            } else {
                state.skip_reset_confirmation.remove(key);
            }
        })
    }

    /// Memory only changes once the new state is on disk.
    fn update(&self, f: impl FnOnce(&mut AppState)) -> Result<(), StoreError> {
        let mut state = self.lock();
        let mut next = state.clone();
        f(&mut next);
        let contents = serde_json::to_string_pretty(&next)?;
        write_atomic(&self.path, &contents)?;
        *state = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Missing or malformed state means nothing is trusted.
fn load_state(path: &Path) -> AppState {
    if !path.exists() {
        return AppState::default();
    }
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|contents| serde_json::from_str(&contents).map_err(|e| e.to_string()));
    match parsed {
        Ok(state) => state,
        Err(error) => {
            warn!(path = %path.display(), %error, "could not load app state, starting empty");
            AppState::default()
        }
    }
}
