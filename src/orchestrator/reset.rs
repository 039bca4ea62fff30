use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppStateStore;
use crate::models::{ConfigSnapshot, Project};

use super::Orchestrator;

pub const RESET_TITLE: &str = "Reset Terminals";
pub const RESET_MESSAGE: &str = "This will close all terminal tabs and reopen the configured startup terminals.\n\nDo you want to continue?";

/// Answer from a yes/no prompt with a "don't ask again" box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confirmation {
    pub accepted: bool,
    pub dont_ask_again: bool,
}

impl Confirmation {
    pub fn yes() -> Self {
        Self {
            accepted: true,
            dont_ask_again: false,
        }
    }

    pub fn always() -> Self {
        Self {
            accepted: true,
            dont_ask_again: true,
        }
    }

    pub fn no() -> Self {
        Self::default()
    }
}

pub trait Confirmer {
    fn confirm(&mut self, title: &str, message: &str) -> Confirmation;
}

impl<F> Confirmer for F
where
    F: FnMut(&str, &str) -> Confirmation,
{
    fn confirm(&mut self, title: &str, message: &str) -> Confirmation {
        self(title, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Declined,
    Completed,
}

/// Close everything and reopen the configured tabs, after confirmation.
pub struct ResetController {
    orchestrator: Arc<Orchestrator>,
    app_state: Arc<AppStateStore>,
}

impl ResetController {
    pub fn new(orchestrator: Arc<Orchestrator>, app_state: Arc<AppStateStore>) -> Self {
        Self {
            orchestrator,
            app_state,
        }
    }

    /// `snapshot` should be read fresh from the store, not the one the
    /// project was started with.
    pub fn run_reset(
        &self,
        project: &Project,
        snapshot: &ConfigSnapshot,
        trust_granted: bool,
        confirmer: &mut dyn Confirmer,
    ) -> ResetOutcome {
        if !self.app_state.skip_reset_confirmation(&project.key) {
            let answer = confirmer.confirm(RESET_TITLE, RESET_MESSAGE);
            if !answer.accepted {
                info!(project = %project.key, "reset declined");
                return ResetOutcome::Declined;
            }
            if answer.dont_ask_again {
                if let Err(e) = self.app_state.set_skip_reset_confirmation(&project.key, true) {
                    warn!(error = %e, "could not save reset preference");
                }
            }
        }

        // Reset always closes, regardless of close_existing_first
        self.orchestrator.cancel_pending();
        self.orchestrator.close_existing();
        let tabs = snapshot.enabled_tabs();
        self.orchestrator.open_tabs(&tabs, &project.root, trust_granted);
        info!(project = %project.key, tabs = tabs.len(), "terminals reset");
        ResetOutcome::Completed
    }
}
