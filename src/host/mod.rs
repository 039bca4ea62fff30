//! The terminal host the orchestrator drives.

mod pty;
#[cfg(test)]
pub(crate) mod testing;

pub use pty::{HostEvent, PtyHost};

use anyhow::Result;
use tracing::warn;

use crate::models::{SessionId, SessionRequest};

pub trait TerminalHost: Send + Sync {
    /// Open sessions in creation order
    fn open_sessions(&self) -> Vec<SessionId>;

    fn close_session(&self, id: SessionId) -> Result<()>;

    fn create_session(&self, request: &SessionRequest) -> Result<SessionId>;

    fn find_session_by_name(&self, name: &str) -> Option<SessionId>;

    fn execute_in_session(&self, id: SessionId, command: &str) -> Result<()>;

    /// Close every open session, continuing past individual failures.
    /// Returns how many closed cleanly.
    fn close_all_sessions(&self) -> usize {
        let mut closed = 0;
        for id in self.open_sessions() {
            match self.close_session(id) {
                Ok(()) => closed += 1,
                Err(e) => warn!(session = %id, error = %e, "failed to close session"),
            }
        }
        closed
    }
}
