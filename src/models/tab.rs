use serde::{Deserialize, Serialize};

use super::shell::DEFAULT_SHELL_ID;

/// One configured terminal tab, opened at startup and on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSpec {
    #[serde(default = "default_tab_name")]
    pub name: String,
    #[serde(default = "default_shell_id")]
    pub shell_id: String,
    /// Empty or "." means the project root
    #[serde(default)]
    pub working_directory: String,
    #[serde(default)]
    pub startup_command: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl TabSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shell_id: default_shell_id(),
            working_directory: String::new(),
            startup_command: String::new(),
            enabled: true,
        }
    }

    pub fn with_shell(mut self, shell_id: impl Into<String>) -> Self {
        self.shell_id = shell_id.into();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn with_startup_command(mut self, command: impl Into<String>) -> Self {
        self.startup_command = command.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The startup command, if it has any non-whitespace content
    pub fn startup_command(&self) -> Option<&str> {
        if self.startup_command.trim().is_empty() {
            None
        } else {
            Some(&self.startup_command)
        }
    }
}

impl Default for TabSpec {
    fn default() -> Self {
        Self::new(default_tab_name())
    }
}

/// Global switches for a startup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, rename = "closeExistingTerminals")]
    pub close_existing_first: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            close_existing_first: false,
        }
    }
}

/// The persisted project record, and the immutable copy a pass works from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(flatten)]
    pub config: OrchestratorConfig,
    #[serde(default)]
    pub tabs: Vec<TabSpec>,
}

impl ConfigSnapshot {
    /// Enabled tabs in configured order
    pub fn enabled_tabs(&self) -> Vec<TabSpec> {
        self.tabs.iter().filter(|tab| tab.enabled).cloned().collect()
    }

    /// Names that appear on more than one tab
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for tab in &self.tabs {
            if !seen.insert(tab.name.as_str()) && !duplicates.contains(&tab.name) {
                duplicates.push(tab.name.clone());
            }
        }
        duplicates
    }
}

fn default_tab_name() -> String {
    "Terminal".to_string()
}

fn default_shell_id() -> String {
    DEFAULT_SHELL_ID.to_string()
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let snapshot: ConfigSnapshot =
            serde_json::from_str(r#"{"tabs":[{"name":"Build"}]}"#).unwrap();

        assert!(snapshot.config.enabled);
        assert!(!snapshot.config.close_existing_first);
        assert_eq!(snapshot.tabs[0].shell_id, "default");
        assert!(snapshot.tabs[0].enabled);
        assert_eq!(snapshot.tabs[0].startup_command(), None);
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let snapshot = ConfigSnapshot {
            config: OrchestratorConfig {
                enabled: true,
                close_existing_first: true,
            },
            tabs: vec![TabSpec::new("Build").with_startup_command("npm test")],
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["closeExistingTerminals"], true);
        assert_eq!(value["tabs"][0]["startupCommand"], "npm test");
        assert_eq!(value["tabs"][0]["shellId"], "default");
        assert_eq!(value["tabs"][0]["workingDirectory"], "");
    }

    #[test]
    fn enabled_tabs_keep_order() {
        let snapshot = ConfigSnapshot {
            config: OrchestratorConfig::default(),
            tabs: vec![
                TabSpec::new("one"),
                TabSpec::new("two").disabled(),
                TabSpec::new("three"),
            ],
        };

        let names: Vec<_> = snapshot.enabled_tabs().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["one", "three"]);
    }

    #[test]
    fn blank_startup_command_is_none() {
        let tab = TabSpec::new("a").with_startup_command("   ");
        assert_eq!(tab.startup_command(), None);
    }

    #[test]
    fn duplicate_names_reported_once() {
        let snapshot = ConfigSnapshot {
            config: OrchestratorConfig::default(),
            tabs: vec![TabSpec::new("a"), TabSpec::new("a"), TabSpec::new("a")],
        };
        assert_eq!(snapshot.duplicate_names(), vec!["a".to_string()]);
    }
}
