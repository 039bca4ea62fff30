//! In-memory host recording every call, for orchestration tests.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::{SessionId, SessionRequest};

use super::TerminalHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Close(String),
    Create {
        name: String,
        working_directory: PathBuf,
        launch_command: Option<Vec<String>>,
    },
    Execute {
        session: SessionId,
        name: String,
        command: String,
    },
}

#[derive(Default)]
struct Inner {
    sessions: Vec<(SessionId, String)>,
    calls: Vec<HostCall>,
}

#[derive(Default)]
pub struct RecordingHost {
    inner: Mutex<Inner>,
    fail_close: HashSet<String>,
    fail_create: HashSet<String>,
    fail_execute: HashSet<String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that already has sessions open with these names
    pub fn with_sessions(names: &[&str]) -> Self {
        let host = Self::new();
        {
            let mut inner = host.inner.lock().unwrap();
            for name in names {
                inner.sessions.push((SessionId::new(), name.to_string()));
            }
        }
        host
    }

    pub fn failing_close(mut self, name: &str) -> Self {
        self.fail_close.insert(name.to_string());
        self
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_string());
        self
    }

    pub fn failing_execute(mut self, name: &str) -> Self {
        self.fail_execute.insert(name.to_string());
        self
    }

    /// Drop a session behind the orchestrator's back
    pub fn forget_session(&self, name: &str) {
        self.inner.lock().unwrap().sessions.retain(|(_, n)| n != name);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn session_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Create { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn executed(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Execute { name, command, .. } => Some((name, command)),
                _ => None,
            })
            .collect()
    }

    /// Commands keyed by the session that received them
    pub fn executed_by_session(&self) -> Vec<(SessionId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Execute { session, command, .. } => Some((session, command)),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HostCall::Close(_)))
            .count()
    }
}

impl TerminalHost for RecordingHost {
    fn open_sessions(&self) -> Vec<SessionId> {
        self.inner.lock().unwrap().sessions.iter().map(|(id, _)| *id).collect()
    }

    fn close_session(&self, id: SessionId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(pos) = inner.sessions.iter().position(|(sid, _)| *sid == id) else {
            bail!("no session {}", id);
        };
        let name = inner.sessions[pos].1.clone();
        inner.calls.push(HostCall::Close(name.clone()));
        if self.fail_close.contains(&name) {
            bail!("close refused for {}", name);
        }
        inner.sessions.remove(pos);
        Ok(())
    }

    fn create_session(&self, request: &SessionRequest) -> Result<SessionId> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(HostCall::Create {
            name: request.name.clone(),
            working_directory: request.working_directory.clone(),
            launch_command: request.launch_command.clone(),
        });
        if self.fail_create.contains(&request.name) {
            bail!("create refused for {}", request.name);
        }
        let id = SessionId::new();
        inner.sessions.push((id, request.name.clone()));
        Ok(id)
    }

    fn find_session_by_name(&self, name: &str) -> Option<SessionId> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .rev()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }

    fn execute_in_session(&self, id: SessionId, command: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(name) = inner
            .sessions
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, n)| n.clone())
        else {
            bail!("no session {}", id);
        };
        inner.calls.push(HostCall::Execute {
            session: id,
            name: name.clone(),
            command: command.to_string(),
        });
        if self.fail_execute.contains(&name) {
            bail!("execute refused for {}", name);
        }
        Ok(())
    }
}
