use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize, PtySystem};
use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
#[cfg(unix)]
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{SessionId, SessionInfo, SessionRequest};

use super::TerminalHost;

/// Output and lifecycle notifications from PTY reader threads.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Output(SessionId, Vec<u8>),
    Exited(SessionId, i32),
}

/// A shell on a pseudo-terminal plus the handles needed to feed and stop it.
struct PtySession {
    info: SessionInfo,
    // Never read, but dropping it closes the PTY under the running shell
    #[allow(dead_code)]
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

impl PtySession {
    fn write_input(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// SIGKILL the shell's whole process group, so jobs it started die too.
    fn kill(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.group() {
                if signal_group(pgid, libc::SIGKILL).is_ok() {
                    return Ok(());
                }
            }
        }

        self.killer.kill()?;
        Ok(())
    }

    /// SIGINT first, SIGKILL if the group is still around after `grace`.
    fn stop(&mut self, grace: Duration) -> Result<()> {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.group() {
                if signal_group(pgid, libc::SIGINT).is_ok() {
                    let deadline = Instant::now() + grace;
                    while Instant::now() < deadline {
                        if !group_alive(pgid) {
                            return Ok(());
                        }
                        std::thread::sleep(STOP_POLL);
                    }
                    return signal_group(pgid, libc::SIGKILL);
                }
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        self.killer.kill()?;
        Ok(())
    }

    /// portable-pty spawns the child with setsid(), so its pid is the group id
    #[cfg(unix)]
    fn group(&self) -> Option<libc::pid_t> {
        self.pid.filter(|pid| *pid > 0).map(|pid| pid as libc::pid_t)
    }
}

#[cfg(unix)]
const STOP_POLL: Duration = Duration::from_millis(25);

#[cfg(unix)]
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> Result<()> {
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        // Group already gone
        Some(libc::ESRCH) => Ok(()),
        _ => Err(err.into()),
    }
}

#[cfg(unix)]
fn group_alive(pgid: libc::pid_t) -> bool {
    if unsafe { libc::kill(-pgid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Terminal host backed by real shell processes on pseudo-terminals.
pub struct PtyHost {
    pty_system: Mutex<Box<dyn PtySystem + Send>>,
    sessions: Mutex<Vec<PtySession>>,
    events: mpsc::Sender<HostEvent>,
    size: PtySize,
}

impl PtyHost {
    pub fn new(events: mpsc::Sender<HostEvent>, rows: u16, cols: u16) -> Self {
        Self {
            pty_system: Mutex::new(native_pty_system()),
            sessions: Mutex::new(Vec::new()),
            events,
            size: PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            },
        }
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.lock().iter().map(|s| s.info.clone()).collect()
    }

    pub fn session_name(&self, id: SessionId) -> Option<String> {
        self.lock()
            .iter()
            .find(|s| s.info.id == id)
            .map(|s| s.info.name.clone())
    }

    pub fn send_input(&self, id: SessionId, data: &[u8]) -> Result<()> {
        let mut sessions = self.lock();
        let session = sessions
            .iter_mut()
            .find(|s| s.info.id == id)
            .ok_or_else(|| anyhow!("session {} is not open", id))?;
        session.write_input(data)
    }

    /// Forget a session whose process has already exited
    pub fn remove_exited(&self, id: SessionId) -> Option<SessionInfo> {
        let mut sessions = self.lock();
        let pos = sessions.iter().position(|s| s.info.id == id)?;
        Some(sessions.remove(pos).info)
    }

    /// Interrupt every session, escalating to SIGKILL after `grace`
    pub fn shutdown(&self, grace: Duration) {
        let drained: Vec<PtySession> = self.lock().drain(..).collect();
        for mut session in drained {
            if let Err(e) = session.stop(grace) {
                warn!(session = %session.info.name, error = %e, "failed to stop session");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PtySession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn build_command(request: &SessionRequest) -> CommandBuilder {
        let mut cmd = match request.launch_command.as_deref() {
            Some([program, args @ ..]) => {
                let mut cmd = CommandBuilder::new(program);
                cmd.args(args);
                cmd
            }
            _ => CommandBuilder::new(default_shell()),
        };
        cmd.cwd(&request.working_directory);
        cmd.env("TERM", "xterm-256color");
        cmd
    }

    fn read_pty_output(
        session_id: SessionId,
        reader: &mut Box<dyn Read + Send>,
        events: mpsc::Sender<HostEvent>,
        mut child: Box<dyn Child + Send + Sync>,
    ) {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    let exit_code = match child.wait() {
                        Ok(status) => status.exit_code() as i32,
                        Err(_) => 1,
                    };
                    let _ = events.blocking_send(HostEvent::Exited(session_id, exit_code));
                    break;
                }
                Ok(n) => {
                    let data = buf[..n].to_vec();
                    if events.blocking_send(HostEvent::Output(session_id, data)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(session = %session_id, error = %e, "pty read failed");
                    let _ = events.blocking_send(HostEvent::Exited(session_id, 1));
                    break;
                }
            }
        }
    }
}

impl TerminalHost for PtyHost {
    fn open_sessions(&self) -> Vec<SessionId> {
        self.lock().iter().map(|s| s.info.id).collect()
    }

    fn close_session(&self, id: SessionId) -> Result<()> {
        let mut session = {
            let mut sessions = self.lock();
            let pos = sessions
                .iter()
                .position(|s| s.info.id == id)
                .ok_or_else(|| anyhow!("session {} is not open", id))?;
            sessions.remove(pos)
        };
        session.kill()?;
        info!(session = %session.info.name, "closed session");
        Ok(())
    }

    fn create_session(&self, request: &SessionRequest) -> Result<SessionId> {
        let pair = self
            .pty_system
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .openpty(self.size)
            .context("Failed to open PTY")?;

        let cmd = Self::build_command(request);
        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn shell for {:?}", request.name))?;
        let killer = child.clone_killer();
        let pid = child.process_id();

        let mut reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let id = SessionId::new();
        let events = self.events.clone();
        std::thread::spawn(move || {
            Self::read_pty_output(id, &mut reader, events, child);
        });

        let info = SessionInfo {
            id,
            name: request.name.clone(),
            working_directory: request.working_directory.clone(),
            started_at: Utc::now(),
        };
        info!(session = %info.name, cwd = %info.working_directory.display(), "created session");
        self.lock().push(PtySession {
            info,
            master: pair.master,
            writer,
            killer,
            pid,
        });
        Ok(id)
    }

    fn find_session_by_name(&self, name: &str) -> Option<SessionId> {
        // Newest first, so a just-created tab wins over an older namesake
        self.lock()
            .iter()
            .rev()
            .find(|s| s.info.name == name)
            .map(|s| s.info.id)
    }

    fn execute_in_session(&self, id: SessionId, command: &str) -> Result<()> {
        let mut input = command.as_bytes().to_vec();
        input.push(b'\n');
        self.send_input(id, &input)
    }
}

fn default_shell() -> String {
    if cfg!(windows) {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_pty::ExitStatus;
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct DummyMaster;

    impl MasterPty for DummyMaster {
        fn resize(&self, _size: PtySize) -> std::result::Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("unused"))
        }

        fn get_size(&self) -> std::result::Result<PtySize, anyhow::Error> {
            Err(anyhow::anyhow!("unused"))
        }

        fn try_clone_reader(&self) -> std::result::Result<Box<dyn Read + Send>, anyhow::Error> {
            Err(anyhow::anyhow!("unused"))
        }

        fn take_writer(&self) -> std::result::Result<Box<dyn io::Write + Send>, anyhow::Error> {
            Err(anyhow::anyhow!("unused"))
        }

        #[cfg(unix)]
        fn process_group_leader(&self) -> Option<libc::pid_t> {
            None
        }

        #[cfg(unix)]
        fn as_raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
            None
        }
    }

    #[derive(Debug)]
    struct CountingKiller {
        calls: Arc<AtomicUsize>,
    }

    impl ChildKiller for CountingKiller {
        fn kill(&mut self) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn clone_killer(&self) -> Box<dyn ChildKiller + Send + Sync> {
            Box::new(CountingKiller {
                calls: self.calls.clone(),
            })
        }
    }

    #[derive(Debug)]
    struct ExitedChild {
        exit_status: ExitStatus,
    }

    impl ChildKiller for ExitedChild {
        fn kill(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn clone_killer(&self) -> Box<dyn ChildKiller + Send + Sync> {
            Box::new(CountingKiller {
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    impl Child for ExitedChild {
        fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
            Ok(Some(self.exit_status.clone()))
        }

        fn wait(&mut self) -> io::Result<ExitStatus> {
            Ok(self.exit_status.clone())
        }

        fn process_id(&self) -> Option<u32> {
            None
        }

        #[cfg(windows)]
        fn as_raw_handle(&self) -> Option<std::os::windows::io::RawHandle> {
            None
        }
    }

    fn exited_child(exit_code: u32) -> Box<dyn Child + Send + Sync> {
        Box::new(ExitedChild {
            exit_status: ExitStatus::with_exit_code(exit_code),
        })
    }

    struct ChunkedReader {
        chunks: Vec<Vec<u8>>,
        index: usize,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.index >= self.chunks.len() {
                return Ok(0);
            }
            let chunk = &self.chunks[self.index];
            let len = chunk.len().min(buf.len());
            buf[..len].copy_from_slice(&chunk[..len]);
            self.index += 1;
            Ok(len)
        }
    }

    #[test]
    fn reader_forwards_output_then_exit() {
        let (tx, mut rx) = mpsc::channel(10);
        let id = SessionId::new();
        let mut reader: Box<dyn Read + Send> = Box::new(ChunkedReader {
            chunks: vec![b"hello".to_vec(), b"world".to_vec()],
            index: 0,
        });

        PtyHost::read_pty_output(id, &mut reader, tx, exited_child(3));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], HostEvent::Output(sid, data) if *sid == id && data == b"hello"));
        assert!(matches!(&events[1], HostEvent::Output(sid, data) if *sid == id && data == b"world"));
        assert!(matches!(&events[2], HostEvent::Exited(sid, 3) if *sid == id));
    }

    #[test]
    fn reader_stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(10);
        drop(rx);
        let mut reader: Box<dyn Read + Send> = Box::new(ChunkedReader {
            chunks: vec![b"lost".to_vec(), b"also lost".to_vec()],
            index: 0,
        });

        PtyHost::read_pty_output(SessionId::new(), &mut reader, tx, exited_child(0));
    }

    #[test]
    fn kill_uses_child_killer_without_pid() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut session = PtySession {
            info: SessionInfo {
                id: SessionId::new(),
                name: "orphan".to_string(),
                working_directory: PathBuf::from("/tmp"),
                started_at: Utc::now(),
            },
            master: Box::new(DummyMaster),
            writer: Box::new(io::sink()),
            killer: Box::new(CountingKiller { calls: calls.clone() }),
            pid: None,
        };

        session.kill().unwrap();
        session.stop(Duration::from_millis(0)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn launch_command_overrides_default_shell() {
        let request = SessionRequest {
            name: "wsl".to_string(),
            working_directory: PathBuf::from("/tmp"),
            launch_command: Some(vec!["wsl.exe".to_string(), "-d".to_string(), "Ubuntu".to_string()]),
        };

        let cmd = PtyHost::build_command(&request);
        let argv: Vec<_> = cmd.get_argv().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(argv, vec!["wsl.exe", "-d", "Ubuntu"]);
    }

    #[test]
    fn empty_launch_command_uses_default_shell() {
        let request = SessionRequest {
            name: "plain".to_string(),
            working_directory: PathBuf::from("/tmp"),
            launch_command: Some(Vec::new()),
        };

        let cmd = PtyHost::build_command(&request);
        assert_eq!(cmd.get_argv()[0].to_string_lossy(), default_shell());
    }
}
