//! Per-project opt-in for running startup commands.
//!
//! Trust only gates command injection. Untrusted projects still get their
//! tabs opened.

use std::sync::Arc;

use tracing::info;

use crate::config::AppStateStore;
use crate::error::StoreError;
use crate::models::ProjectKey;

#[derive(Clone)]
pub struct TrustGate {
    store: Arc<AppStateStore>,
}

impl TrustGate {
    pub fn new(store: Arc<AppStateStore>) -> Self {
        Self { store }
    }

    /// Absence of a record means untrusted.
    pub fn is_trusted(&self, key: &ProjectKey) -> bool {
        self.store.is_trusted(key)
    }

    pub fn trust(&self, key: &ProjectKey) -> Result<(), StoreError> {
        self.store.set_trusted(key, true)?;
        info!(project = %key, "project trusted to run startup commands");
        Ok(())
    }

    pub fn untrust(&self, key: &ProjectKey) -> Result<(), StoreError> {
        self.store.set_trusted(key, false)?;
        info!(project = %key, "project trust revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gate(dir: &TempDir) -> TrustGate {
        TrustGate::new(Arc::new(AppStateStore::open_at(dir.path().join("state.json"))))
    }

    #[test]
    fn untrusted_by_default() {
        let dir = TempDir::new().unwrap();
        assert!(!gate(&dir).is_trusted(&ProjectKey::normalize("/work/app")));
    }

    #[test]
    fn trust_matches_across_path_spellings() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        gate.trust(&ProjectKey::normalize("C:\\work\\app\\")).unwrap();

        assert!(gate.is_trusted(&ProjectKey::normalize("C:/work/app")));
    }

    #[test]
    fn untrust_removes_record() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        let key = ProjectKey::normalize("/work/app");

        gate.trust(&key).unwrap();
        gate.untrust(&key).unwrap();

        assert!(!gate.is_trusted(&key));
    }

    #[test]
    fn trust_survives_restart() {
        let dir = TempDir::new().unwrap();
        let key = ProjectKey::normalize("/work/app");
        gate(&dir).trust(&key).unwrap();

        assert!(gate(&dir).is_trusted(&key));
    }
}
