use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{ConfigSnapshot, TabSpec};

use super::write_atomic;

/// Directory under the project root holding the startup record
pub const CONFIG_DIR: &str = ".terminals";
pub const CONFIG_FILE: &str = "startup-terminals.json";

/// Per-project tab configuration.
///
/// Nothing is read until the first [`ConfigStore::snapshot`]; edits stay in
/// memory until [`ConfigStore::save`].
pub struct ConfigStore {
    path: PathBuf,
    current: Mutex<Option<ConfigSnapshot>>,
}

impl ConfigStore {
    pub fn new(project_root: &Path) -> Self {
        Self::at(project_root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            current: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current configuration, loading it on first use
    pub fn snapshot(&self) -> ConfigSnapshot {
        self.loaded().as_ref().cloned().unwrap_or_default()
    }

    /// Re-read the record from disk, discarding unsaved edits
    pub fn reload(&self) -> ConfigSnapshot {
        let fresh = load_record(&self.path);
        *self.lock() = Some(fresh.clone());
        fresh
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let snapshot = self.snapshot();
        let contents = serde_json::to_string_pretty(&snapshot)?;
        write_atomic(&self.path, &contents)?;
        debug!(path = %self.path.display(), tabs = snapshot.tabs.len(), "saved startup terminals");
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.edit(|snapshot| snapshot.config.enabled = enabled);
    }

    pub fn set_close_existing_first(&self, close: bool) {
        self.edit(|snapshot| snapshot.config.close_existing_first = close);
    }

    /// Append a tab; names must stay unique so injection can find the session.
    pub fn add_tab(&self, tab: TabSpec) -> Result<(), StoreError> {
        self.try_edit(|snapshot| {
            if snapshot.tabs.iter().any(|t| t.name == tab.name) {
                return Err(StoreError::DuplicateTabName(tab.name.clone()));
            }
            snapshot.tabs.push(tab);
            Ok(())
        })
    }

    pub fn remove_tab(&self, index: usize) -> Result<TabSpec, StoreError> {
        self.try_edit(|snapshot| {
            check_index(index, snapshot.tabs.len())?;
            Ok(snapshot.tabs.remove(index))
        })
    }

    pub fn move_tab(&self, from: usize, to: usize) -> Result<(), StoreError> {
        self.try_edit(|snapshot| {
            let len = snapshot.tabs.len();
            check_index(from, len)?;
            check_index(to, len)?;
            let tab = snapshot.tabs.remove(from);
            snapshot.tabs.insert(to, tab);
            Ok(())
        })
    }

    pub fn set_tab_enabled(&self, index: usize, enabled: bool) -> Result<(), StoreError> {
        self.try_edit(|snapshot| {
            check_index(index, snapshot.tabs.len())?;
            snapshot.tabs[index].enabled = enabled;
            Ok(())
        })
    }

    fn edit(&self, f: impl FnOnce(&mut ConfigSnapshot)) {
        let mut guard = self.loaded();
        if let Some(snapshot) = guard.as_mut() {
            f(snapshot);
        }
    }

    fn try_edit<T>(
        &self,
        f: impl FnOnce(&mut ConfigSnapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.loaded();
        let snapshot = guard.get_or_insert_with(ConfigSnapshot::default);
        f(snapshot)
    }

    fn loaded(&self) -> MutexGuard<'_, Option<ConfigSnapshot>> {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(load_record(&self.path));
        }
        guard
    }

    fn lock(&self) -> MutexGuard<'_, Option<ConfigSnapshot>> {
        // A poisoned lock still holds a complete snapshot
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_index(index: usize, len: usize) -> Result<(), StoreError> {
    if index >= len {
        return Err(StoreError::TabIndexOutOfRange { index, len });
    }
    Ok(())
}

/// Missing or unreadable records fall back to defaults.
fn load_record(path: &Path) -> ConfigSnapshot {
    if !path.exists() {
        return ConfigSnapshot::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read startup terminals, using defaults");
            return ConfigSnapshot::default();
        }
    };

    match serde_json::from_str::<ConfigSnapshot>(&contents) {
        Ok(snapshot) => {
            let duplicates = snapshot.duplicate_names();
            if !duplicates.is_empty() {
                warn!(?duplicates, "duplicate tab names; startup commands go to the newest matching session");
            }
            snapshot
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed startup terminals, using defaults");
            ConfigSnapshot::default()
        }
    }
}
