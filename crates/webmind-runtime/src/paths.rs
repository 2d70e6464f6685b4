//! Path utilities for Webmind data directories.

use std::path::PathBuf;

/// Get the Webmind data directory (~/.webmind/).
///
/// Falls back to `.webmind` in the working directory when no home
/// directory is known.
pub fn webmind_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".webmind"))
        .unwrap_or_else(|| PathBuf::from(".webmind"))
}

/// Get the persisted state file (~/.webmind/state.json).
pub fn state_file() -> PathBuf {
    webmind_data_dir().join("state.json")
}
