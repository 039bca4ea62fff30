//! Startup orchestration: turns a configuration snapshot into an ordered
//! series of session creations on the terminal host, with optional delayed
//! startup-command injection.

mod reset;
mod workdir;


pub use reset::{Confirmation, Confirmer, ResetController, ResetOutcome};
pub use workdir::resolve_working_directory;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::host::TerminalHost;
use crate::models::{ConfigSnapshot, SessionId, SessionRequest, TabSpec};
use crate::shells::ShellRegistry;

/// Wait between creating a session and typing its startup command
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

pub struct Orchestrator {
    host: Arc<dyn TerminalHost>,
    shells: Arc<ShellRegistry>,
    settle_delay: Duration,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(host: Arc<dyn TerminalHost>, shells: Arc<ShellRegistry>) -> Self {
        Self {
            host,
            shells,
            settle_delay: DEFAULT_SETTLE_DELAY,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Open the configured tabs for a freshly loaded project.
    ///
    /// Nothing is reported back: failed closes, creations and injections are
    /// logged and the pass carries on. Injections need a tokio runtime.
    pub fn run_startup(&self, snapshot: &ConfigSnapshot, project_root: &Path, trust_granted: bool) {
        if !snapshot.config.enabled {
            debug!("startup terminals disabled");
            return;
        }

        let tabs = snapshot.enabled_tabs();
        if tabs.is_empty() {
            debug!("no enabled startup terminals");
            return;
        }

        if snapshot.config.close_existing_first {
            self.close_existing();
        }
        self.open_tabs(&tabs, project_root, trust_granted);
    }

    pub(crate) fn close_existing(&self) {
        let closed = self.host.close_all_sessions();
        debug!(closed, "closed existing sessions");
    }

    /// Create each tab in order; session N+1 is requested only after
    /// session N's creation call has returned.
    pub(crate) fn open_tabs(&self, tabs: &[TabSpec], project_root: &Path, trust_granted: bool) {
        for tab in tabs {
            self.open_tab(tab, project_root, trust_granted);
        }
        info!(tabs = tabs.len(), trusted = trust_granted, "opened startup terminals");
    }

    fn open_tab(&self, tab: &TabSpec, project_root: &Path, trust_granted: bool) {
        let request = SessionRequest {
            name: tab.name.clone(),
            working_directory: resolve_working_directory(&tab.working_directory, project_root),
            launch_command: self.shells.launch_command(&tab.shell_id),
        };

        let session = match self.host.create_session(&request) {
            Ok(session) => session,
            Err(e) => {
                warn!(tab = %tab.name, error = %e, "failed to create terminal");
                return;
            }
        };

        let Some(command) = tab.startup_command() else {
            return;
        };
        if trust_granted {
            self.schedule_injection(session, tab.name.clone(), command.to_string());
        } else {
            debug!(tab = %tab.name, "project not trusted, skipping startup command");
        }
    }

    fn schedule_injection(&self, session: SessionId, name: String, command: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(tab = %name, "no async runtime, startup command dropped");
            return;
        };

        let host = Arc::downgrade(&self.host);
        let delay = self.settle_delay;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inject(&host, session, &name, &command);
        });

        let mut pending = self.lock_pending();
        pending.retain(|task| !task.is_finished());
        pending.push(task);
    }

    /// Injections scheduled but not yet fired
    #[cfg(test)]
    pub fn pending_injections(&self) -> usize {
        self.lock_pending().iter().filter(|task| !task.is_finished()).count()
    }

    /// Drop every injection that has not fired yet
    pub fn cancel_pending(&self) {
        for task in self.lock_pending().drain(..) {
            task.abort();
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Best effort: a vanished host, a closed session or a failed write are
/// all silently dropped. The session is addressed by the id its creation
/// returned, so tabs sharing a name each get their own command.
fn inject(host: &Weak<dyn TerminalHost>, session: SessionId, name: &str, command: &str) {
    let Some(host) = host.upgrade() else {
        debug!(tab = %name, "host gone before startup command");
        return;
    };
    if !host.open_sessions().contains(&session) {
        debug!(tab = %name, "session closed before startup command");
        return;
    }
    match host.execute_in_session(session, command) {
        Ok(()) => debug!(tab = %name, "sent startup command"),
        Err(e) => debug!(tab = %name, error = %e, "startup command failed"),
    }
}
