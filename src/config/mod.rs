mod app_state;
mod store;

pub use app_state::AppStateStore;
pub use store::ConfigStore;

use std::fs;
use std::path::Path;

use crate::error::{io_err, StoreError};

/// Write `contents` to `path` through a sibling temp file and a rename,
/// creating the parent directory first.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).map_err(|e| io_err(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
