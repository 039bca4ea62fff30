mod project;
mod session;
mod shell;
mod tab;

pub use project::{Project, ProjectKey};
pub use session::{SessionId, SessionInfo, SessionRequest};
pub use shell::{ShellEntry, DEFAULT_SHELL_ID};
pub use tab::{ConfigSnapshot, TabSpec};
#[cfg(test)]
pub use tab::OrchestratorConfig;
