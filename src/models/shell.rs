use serde::{Deserialize, Serialize};

/// Sentinel id meaning "use the host's own default shell"
pub const DEFAULT_SHELL_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellEntry {
    pub id: String,
    pub display_name: String,
    /// Empty means the host default launcher
    pub launch_command: Vec<String>,
}

impl ShellEntry {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, launch_command: Vec<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            launch_command,
        }
    }

    pub fn host_default() -> Self {
        Self::new(DEFAULT_SHELL_ID, "Default (IDE Setting)", Vec::new())
    }

    pub fn is_host_default(&self) -> bool {
        self.id == DEFAULT_SHELL_ID || self.launch_command.is_empty()
    }
}

impl std::fmt::Display for ShellEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name)
    }
}
