//! Centralized directory structure management for Re-Chat
//!
//! Directory layout:
//! ```text
//! rechat_data/
//! ├── local/           # SQLite database, server-local state
//! └── logs/            # Rotated server logs
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug)]
struct RechatConfig {
    rechat_root: Option<PathBuf>,
}

/// Get the global configuration path
fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rechat").join("config.json"))
}

/// Load the persistent root from config file
pub fn load_persistent_root() -> Option<PathBuf> {
    let path = get_config_path()?;
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str::<RechatConfig>(&content) {
            Ok(config) => config.rechat_root,
            Err(e) => {
                warn!("Failed to parse config file at {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read config file at {:?}: {}", path, e);
            None
        }
    }
}

/// Save a path as the persistent Re-Chat root
pub fn save_persistent_root(root: PathBuf) -> anyhow::Result<()> {
    let path = get_config_path().ok_or_else(|| anyhow::anyhow!("Could not determine config dir"))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config = RechatConfig {
        rechat_root: Some(root),
    };
    let json = serde_json::to_string_pretty(&config)?;
    fs::write(path, json)?;
    Ok(())
}

/// Get the RECHAT_ROOT directory from environment, persistent config, or default
pub fn rechat_root() -> PathBuf {
    // 1. Check environment variable
    if let Ok(val) = std::env::var("RECHAT_ROOT") {
        return PathBuf::from(val);
    }

    // 2. Check persistent config
    if let Some(root) = load_persistent_root() {
        // Set env var so subprocesses see it too
        std::env::set_var("RECHAT_ROOT", &root);
        return root;
    }

    // 3. Default fallback
    PathBuf::from("rechat_data")
}

/// Set the RECHAT_ROOT directory at runtime
pub fn set_rechat_root(path: PathBuf) {
    info!("Setting RECHAT_ROOT to: {:?}", path);
    std::env::set_var("RECHAT_ROOT", path);
}

/// Local data directory (SQLite, server state)
pub fn local_dir() -> PathBuf {
    rechat_root().join("local")
}

/// Server log directory
pub fn logs_dir() -> PathBuf {
    rechat_root().join("logs")
}

/// Database file path
pub fn db_path() -> PathBuf {
    local_dir().join("rechat.sqlite")
}

/// Ensure a single directory exists
pub fn ensure_dir(path: &PathBuf) -> anyhow::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent(path: &PathBuf) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(&parent.to_path_buf())?;
    }
    Ok(())
}

/// Initialize the complete directory structure
/// Call this once at server startup before any other operations
pub fn init_structure() -> anyhow::Result<PathBuf> {
    let root = rechat_root();

    // Ensure root exists first
    ensure_dir(&root)?;

    ensure_dir(&local_dir())?;
    ensure_dir(&logs_dir())?;

    // Canonicalize for absolute path
    let canonical = std::fs::canonicalize(&root).unwrap_or_else(|_| root.clone());

    info!("Re-Chat directory structure initialized at: {:?}", canonical);

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_lives_under_local_dir() {
        let db = db_path();
        assert!(db.to_string_lossy().ends_with("rechat.sqlite"));
        assert!(db.starts_with(local_dir()));
    }

    #[test]
    fn test_subdirs_hang_off_root() {
        let root = rechat_root();
        assert!(local_dir().starts_with(&root));
        assert!(logs_dir().starts_with(&root));
    }
}
