//! One-shot subcommands that edit or print the stored configuration.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::sync::Arc;
use tracing::warn;

use crate::config::{AppStateStore, ConfigStore};
use crate::models::{Project, TabSpec, DEFAULT_SHELL_ID};
use crate::shells::ShellRegistry;
use crate::trust::TrustGate;

#[derive(Subcommand)]
pub enum TabCommand {
    /// List configured tabs
    List,
    /// Append a tab
    Add {
        /// Display name (must be unique)
        name: String,
        /// Shell id from `terminal-manager shells`
        #[arg(long, default_value = DEFAULT_SHELL_ID)]
        shell: String,
        /// Working directory, absolute or relative to the project root
        #[arg(long, default_value = "")]
        dir: String,
        /// Command typed into the terminal once it is ready
        #[arg(long, default_value = "")]
        command: String,
        /// Add the tab switched off
        #[arg(long)]
        disabled: bool,
    },
    /// Remove the tab at a 1-based position
    Remove { position: usize },
    /// Move a tab from one 1-based position to another
    Move { from: usize, to: usize },
    /// Include a tab in startup and reset
    Enable { position: usize },
    /// Leave a tab out of startup and reset
    Disable { position: usize },
}

/// Optional overrides from `config set`
#[derive(Debug, Default)]
pub struct ConfigChanges {
    pub enabled: Option<bool>,
    pub close_existing: Option<bool>,
    pub skip_reset_confirmation: Option<bool>,
}

pub fn tabs_command(project: &Project, command: TabCommand) -> Result<()> {
    let store = ConfigStore::new(&project.root);

    match command {
        TabCommand::List => {
            print_tabs(&store);
            return Ok(());
        }
        TabCommand::Add {
            name,
            shell,
            dir,
            command,
            disabled,
        } => {
            if ShellRegistry::platform().lookup(&shell).is_none() {
                warn!(shell = %shell, "shell not detected here; the host default will be used");
            }
            let mut tab = TabSpec::new(name)
                .with_shell(shell)
                .with_working_directory(dir)
                .with_startup_command(command);
            if disabled {
                tab = tab.disabled();
            }
            store.add_tab(tab)?;
        }
        TabCommand::Remove { position } => {
            let removed = store.remove_tab(index(position)?)?;
            println!("Removed {}", removed.name);
        }
        TabCommand::Move { from, to } => store.move_tab(index(from)?, index(to)?)?,
        TabCommand::Enable { position } => store.set_tab_enabled(index(position)?, true)?,
        TabCommand::Disable { position } => store.set_tab_enabled(index(position)?, false)?,
    }

    store.save().context("Failed to save startup terminals")?;
    print_tabs(&store);
    Ok(())
}

pub fn show_config(project: &Project) -> Result<()> {
    let store = ConfigStore::new(&project.root);
    let app_state = AppStateStore::open()?;
    let snapshot = store.snapshot();

    println!("Project: {} ({})", project.name(), project.root.display());
    println!("Config:  {}", store.path().display());
    println!("State:   {}", app_state.path().display());
    println!("Trusted: {}", yes_no(app_state.is_trusted(&project.key)));
    println!(
        "Confirm reset: {}",
        yes_no(!app_state.skip_reset_confirmation(&project.key))
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn set_config(project: &Project, changes: ConfigChanges) -> Result<()> {
    if changes.enabled.is_some() || changes.close_existing.is_some() {
        let store = ConfigStore::new(&project.root);
        if let Some(enabled) = changes.enabled {
            store.set_enabled(enabled);
        }
        if let Some(close) = changes.close_existing {
            store.set_close_existing_first(close);
        }
        store.save().context("Failed to save startup terminals")?;
    }

    if let Some(skip) = changes.skip_reset_confirmation {
        AppStateStore::open()?.set_skip_reset_confirmation(&project.key, skip)?;
    }

    show_config(project)
}

pub fn set_trust(project: &Project, trusted: bool) -> Result<()> {
    let gate = TrustGate::new(Arc::new(AppStateStore::open()?));
    if trusted {
        gate.trust(&project.key)?;
        println!("Startup commands will run for {}", project.key);
    } else {
        gate.untrust(&project.key)?;
        println!("Startup commands will not run for {}", project.key);
    }
    Ok(())
}

pub fn trust_status(project: &Project) -> Result<()> {
    let gate = TrustGate::new(Arc::new(AppStateStore::open()?));
    if gate.is_trusted(&project.key) {
        println!("{} is trusted", project.key);
    } else {
        println!("{} is not trusted; tabs open without startup commands", project.key);
    }
    Ok(())
}

pub fn list_shells() {
    print_shells(&ShellRegistry::platform());
}

pub(super) fn print_shells(registry: &ShellRegistry) {
    for shell in registry.list().iter() {
        if shell.launch_command.is_empty() {
            println!("{:<16} {}", shell.id, shell.display_name);
        } else {
            println!(
                "{:<16} {:<24} {}",
                shell.id,
                shell.display_name,
                shell.launch_command.join(" ")
            );
        }
    }
}

fn print_tabs(store: &ConfigStore) {
    let snapshot = store.snapshot();
    if snapshot.tabs.is_empty() {
        println!("No startup terminals configured");
        return;
    }
    for (i, tab) in snapshot.tabs.iter().enumerate() {
        let mark = if tab.enabled { "x" } else { " " };
        let dir = if tab.working_directory.is_empty() {
            "."
        } else {
            tab.working_directory.as_str()
        };
        println!(
            "{:>2}. [{}] {:<16} shell={:<10} dir={:<16} {}",
            i + 1,
            mark,
            tab.name,
            tab.shell_id,
            dir,
            tab.startup_command
        );
    }
}

/// 1-based position from the command line to a list index
fn index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .context("positions start at 1")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
