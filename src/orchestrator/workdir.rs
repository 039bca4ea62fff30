use std::path::{Path, PathBuf};

/// Resolve a tab's configured directory, falling back to the project root
/// whenever the result is not an existing directory.
pub fn resolve_working_directory(configured: &str, project_root: &Path) -> PathBuf {
    // Whitespace only decides "blank"; a non-blank path is taken literally
    if configured.trim().is_empty() || configured.trim() == "." {
        return project_root.to_path_buf();
    }

    let path = Path::new(configured);
    let candidate = if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    };

    if candidate.is_dir() {
        candidate
    } else {
        project_root.to_path_buf()
    }
}
