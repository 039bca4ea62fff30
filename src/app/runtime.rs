use anyhow::Result;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{AppStateStore, ConfigStore};
use crate::host::{HostEvent, PtyHost, TerminalHost};
use crate::models::{Project, SessionId};
use crate::orchestrator::{Confirmation, Confirmer, Orchestrator, ResetController, ResetOutcome};
use crate::shells::ShellRegistry;
use crate::trust::TrustGate;

use super::commands::print_shells;
use super::input::{parse_answer, parse_command, AttachCommand, HELP};
use super::output::LineBuffer;

pub struct AttachOptions {
    pub settle_delay: Duration,
    pub rows: u16,
    pub cols: u16,
}

/// Grace period for sessions to exit on SIGINT before they are killed
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

enum Step {
    Host(Option<HostEvent>),
    Line(Option<String>),
    Interrupt,
}

/// Run the startup pass against real shells and stream their output until
/// every session exits, `:quit` is typed, or Ctrl-C.
pub async fn run_attached(project: Project, options: AttachOptions) -> Result<()> {
    let store = ConfigStore::new(&project.root);
    let app_state = Arc::new(AppStateStore::open()?);
    let trust = TrustGate::new(app_state.clone());
    let shells = Arc::new(ShellRegistry::platform());

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let pty_host = Arc::new(PtyHost::new(event_tx, options.rows, options.cols));
    let host: Arc<dyn TerminalHost> = pty_host.clone();
    let orchestrator =
        Arc::new(Orchestrator::new(host, shells.clone()).with_settle_delay(options.settle_delay));
    let reset = ResetController::new(orchestrator.clone(), app_state);

    let snapshot = store.snapshot();
    let trusted = trust.is_trusted(&project.key);
    if !trusted && snapshot.enabled_tabs().iter().any(|t| t.startup_command().is_some()) {
        warn!("project is not trusted, startup commands will not run (see `terminal-manager trust`)");
    }
    orchestrator.run_startup(&snapshot, &project.root, trusted);

    if pty_host.sessions().is_empty() {
        info!(config = %store.path().display(), "no startup terminals opened");
        return Ok(());
    }

    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut output = LineBuffer::default();
    let mut names: HashMap<SessionId, String> = HashMap::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let step = tokio::select! {
            event = event_rx.recv() => Step::Host(event),
            line = lines.recv(), if stdin_open => Step::Line(line),
            _ = &mut ctrl_c => Step::Interrupt,
        };

        match step {
            Step::Host(Some(HostEvent::Output(id, data))) => {
                let name = session_label(&pty_host, &mut names, id);
                for line in output.push(id, &data) {
                    println!("[{}] {}", name, line);
                }
            }
            Step::Host(Some(HostEvent::Exited(id, code))) => {
                let name = session_label(&pty_host, &mut names, id);
                if let Some(rest) = output.flush(id) {
                    println!("[{}] {}", name, rest);
                }
                // Sessions closed by a reset are already gone from the host
                if pty_host.remove_exited(id).is_some() {
                    info!(session = %name, code, "session exited");
                }
                if pty_host.sessions().is_empty() {
                    info!("all sessions exited");
                    break;
                }
            }
            Step::Host(None) | Step::Interrupt => break,
            Step::Line(None) => stdin_open = false,
            Step::Line(Some(line)) => match parse_command(&line) {
                Some(AttachCommand::Quit) => break,
                Some(AttachCommand::Reset) => {
                    // Always the configuration as it is now on disk
                    let snapshot = store.reload();
                    let trusted = trust.is_trusted(&project.key);
                    let mut confirmer = StdinConfirmer { lines: &mut lines };
                    if reset.run_reset(&project, &snapshot, trusted, &mut confirmer) == ResetOutcome::Declined {
                        println!("Reset cancelled");
                    }
                }
                Some(AttachCommand::List) => {
                    for session in pty_host.sessions() {
                        println!(
                            "{}  {:<16} {:<8} {}",
                            session.id.short(),
                            session.name,
                            session.duration_string(),
                            session.working_directory.display()
                        );
                    }
                }
                Some(AttachCommand::Send { name, command }) => {
                    match pty_host.find_session_by_name(&name) {
                        Some(id) => {
                            if let Err(e) = pty_host.execute_in_session(id, &command) {
                                warn!(session = %name, error = %e, "failed to send command");
                            }
                        }
                        None => println!("No session named {:?}", name),
                    }
                }
                Some(AttachCommand::Shells) => {
                    // Later resets pick up shells installed since startup
                    shells.refresh();
                    print_shells(&shells);
                }
                Some(AttachCommand::Help) => println!("{}", HELP),
                Some(AttachCommand::Unknown(text)) => println!("Unknown command {:?}, try :help", text),
                None if line.trim().is_empty() => {}
                None => println!("Commands start with ':', try :help"),
            },
        }
    }

    orchestrator.cancel_pending();
    // Stopping polls each process group with blocking sleeps
    tokio::task::spawn_blocking(move || pty_host.shutdown(SHUTDOWN_GRACE)).await?;
    Ok(())
}

fn session_label(host: &PtyHost, names: &mut HashMap<SessionId, String>, id: SessionId) -> String {
    names
        .entry(id)
        .or_insert_with(|| host.session_name(id).unwrap_or_else(|| id.short()))
        .clone()
}

/// Forward stdin lines from a blocking thread
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Asks on stdout and reads the answer from the attached stdin stream.
struct StdinConfirmer<'a> {
    lines: &'a mut mpsc::UnboundedReceiver<String>,
}

impl Confirmer for StdinConfirmer<'_> {
    fn confirm(&mut self, title: &str, message: &str) -> Confirmation {
        println!("{}\n{}", title, message);
        print!("[y]es / [n]o / [a]lways: ");
        let _ = std::io::stdout().flush();

        // The attached loop runs on the multi-threaded runtime
        let answer = tokio::task::block_in_place(|| self.lines.blocking_recv());
        answer.map(|line| parse_answer(&line)).unwrap_or_default()
    }
}
