//! Cached lookup from shell id to launch command.

mod probe;

pub use probe::PlatformProbe;

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::models::{ShellEntry, DEFAULT_SHELL_ID};

/// Source of installed shells. Called once per cache fill.
pub trait ShellProbe: Send + Sync {
    fn probe(&self) -> Vec<ShellEntry>;
}

pub struct ShellRegistry {
    probe: Box<dyn ShellProbe>,
    cache: RwLock<Option<Arc<Vec<ShellEntry>>>>,
}

impl ShellRegistry {
    pub fn new(probe: impl ShellProbe + 'static) -> Self {
        Self {
            probe: Box::new(probe),
            cache: RwLock::new(None),
        }
    }

    pub fn platform() -> Self {
        Self::new(PlatformProbe::default())
    }

    /// Known shells, the host default sentinel first.
    pub fn list(&self) -> Arc<Vec<ShellEntry>> {
        if let Some(cached) = self.cache.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Arc::clone(cached);
        }

        let mut shells = vec![ShellEntry::host_default()];
        for entry in self.probe.probe() {
            if entry.id == DEFAULT_SHELL_ID || shells.iter().any(|s| s.id == entry.id) {
                continue;
            }
            shells.push(entry);
        }
        debug!(count = shells.len(), "probed shells");

        let shells = Arc::new(shells);
        // A concurrent refresh may clear this again; last writer wins
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&shells));
        shells
    }

    pub fn lookup(&self, id: &str) -> Option<ShellEntry> {
        self.list().iter().find(|s| s.id == id).cloned()
    }

    /// Launch command for `id`, or `None` when the host default should be used
    pub fn launch_command(&self, id: &str) -> Option<Vec<String>> {
        if id == DEFAULT_SHELL_ID {
            return None;
        }
        self.lookup(id)
            .filter(|shell| !shell.is_host_default())
            .map(|shell| shell.launch_command)
    }

    /// Forget cached results; the next `list` probes again.
    pub fn refresh(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
