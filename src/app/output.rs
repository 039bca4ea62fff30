use std::collections::HashMap;

use crate::models::SessionId;

/// Splits raw PTY bytes into complete lines, per session.
#[derive(Default)]
pub struct LineBuffer {
    partial: HashMap<SessionId, Vec<u8>>,
}

impl LineBuffer {
    /// Append output and return every line it completes
    pub fn push(&mut self, id: SessionId, data: &[u8]) -> Vec<String> {
        let buf = self.partial.entry(id).or_default();
        buf.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            lines.push(clean(&line));
        }
        lines
    }

    /// Whatever is left once a session exits
    pub fn flush(&mut self, id: SessionId) -> Option<String> {
        let rest = self.partial.remove(&id)?;
        let line = clean(&rest);
        (!line.is_empty()).then_some(line)
    }
}

fn clean(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string()
}
