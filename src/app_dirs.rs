use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/dictate`, or the platform data dir when `HOME` is unset
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("dictate"),
            )
        } else {
            ProjectDirs::from("", "", "dictate")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("sentences.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("dictate.log"))
    }

    /// Files produced by the audio generator
    pub fn audio_dir() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("audio"))
    }
}
