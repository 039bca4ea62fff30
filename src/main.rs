mod app;
mod config;
mod error;
mod host;
mod models;
mod orchestrator;
mod shells;
mod trust;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use app::{AttachOptions, ConfigChanges, TabCommand};
use models::Project;

#[derive(Parser)]
#[command(name = "terminal-manager")]
#[command(version = "0.1.0")]
#[command(about = "Open and configure a project's startup terminals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true, env = "TERMINAL_MANAGER_PROJECT")]
    project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the startup terminals and attach to their output
    Run {
        /// Delay before typing startup commands, in milliseconds
        #[arg(long, default_value_t = 500)]
        settle_ms: u64,
        /// PTY height
        #[arg(long, default_value_t = 24)]
        rows: u16,
        /// PTY width
        #[arg(long, default_value_t = 120)]
        cols: u16,
    },
    /// Edit the startup tab list
    Tabs {
        #[command(subcommand)]
        command: TabCommand,
    },
    /// Show or change global switches
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Allow this project's startup commands to run
    Trust,
    /// Stop running this project's startup commands
    Untrust,
    /// Show whether this project is trusted
    TrustStatus,
    /// List detected shells
    Shells,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the project's configuration
    Show,
    /// Change global switches
    Set {
        /// Master switch for startup terminals
        #[arg(long)]
        enabled: Option<bool>,
        /// Close open terminals before opening startup terminals
        #[arg(long)]
        close_existing: Option<bool>,
        /// Reset without asking first
        #[arg(long)]
        skip_reset_confirmation: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries session output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let project = Project::resolve(cli.project);

    match cli.command {
        Commands::Run {
            settle_ms,
            rows,
            cols,
        } => {
            let options = AttachOptions {
                settle_delay: std::time::Duration::from_millis(settle_ms),
                rows,
                cols,
            };
            app::run_attached(project, options).await?;
        }
        Commands::Tabs { command } => app::tabs_command(&project, command)?,
        Commands::Config { command } => match command {
            ConfigCommand::Show => app::show_config(&project)?,
            ConfigCommand::Set {
                enabled,
                close_existing,
                skip_reset_confirmation,
            } => app::set_config(
                &project,
                ConfigChanges {
                    enabled,
                    close_existing,
                    skip_reset_confirmation,
                },
            )?,
        },
        Commands::Trust => app::set_trust(&project, true)?,
        Commands::Untrust => app::set_trust(&project, false)?,
        Commands::TrustStatus => app::trust_status(&project)?,
        Commands::Shells => app::list_shells(),
    }

    Ok(())
}
