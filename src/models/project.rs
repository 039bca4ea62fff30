use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Normalized project path used as the key for trust and per-project flags.
///
/// Backslashes become forward slashes and trailing slashes are dropped, so
/// `C:\work\app\` and `C:/work/app` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(String);

impl ProjectKey {
    pub fn normalize(path: &str) -> Self {
        let replaced = path.replace('\\', "/");
        Self(replaced.trim_end_matches('/').to_string())
    }

    pub fn from_path(path: &Path) -> Self {
        Self::normalize(&path.to_string_lossy())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded project: its root directory and its trust key.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub key: ProjectKey,
}

impl Project {
    pub fn new(root: PathBuf) -> Self {
        let key = ProjectKey::from_path(&root);
        Self { root, key }
    }

    /// Resolve an optional CLI path against the current directory, falling
    /// back to the home directory when neither is available.
    pub fn resolve(path: Option<PathBuf>) -> Self {
        let root = match path {
            Some(p) if p.is_absolute() => p,
            Some(p) => std::env::current_dir().map(|cwd| cwd.join(&p)).unwrap_or(p),
            None => std::env::current_dir()
                .ok()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let root = root.canonicalize().unwrap_or(root);
        Self::new(root)
    }

    pub fn name(&self) -> String {
        self.root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}
