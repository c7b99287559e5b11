use directories::ProjectDirs;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub completion_sound: bool,
    pub keypress_sound: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            completion_sound: true,
            keypress_sound: true,
        }
    }
}

impl Preferences {
    /// Read preferences from loosely typed JSON. Anything that is not an object
    /// yields `None`; fields that are missing or not booleans fall back to defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let defaults = Self::default();
        let flag = |key: &str, fallback: bool| {
            object.get(key).and_then(Value::as_bool).unwrap_or(fallback)
        };
        Some(Self {
            completion_sound: flag("completionSound", defaults.completion_sound),
            keypress_sound: flag("keypressSound", defaults.keypress_sound),
        })
    }
}

impl<'de> Deserialize<'de> for Preferences {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub preferences: Preferences,
    pub current_index: usize,
    /// Text-to-speech command; the sentence is appended as the last argument
    pub speech_command: Option<String>,
    /// Run as `<cmd> <text> <output.wav>` when a sentence is added
    pub audio_generator: Option<String>,
    /// Where sentence audio files live; defaults to the state dir's `audio/`
    pub audio_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferences: Preferences::default(),
            current_index: 0,
            speech_command: default_speech_command(),
            audio_generator: None,
            audio_dir: None,
        }
    }
}

#[cfg(target_os = "macos")]
fn default_speech_command() -> Option<String> {
    Some("say -r 170".to_string())
}

#[cfg(not(target_os = "macos"))]
fn default_speech_command() -> Option<String> {
    Some("espeak -s 165".to_string())
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "dictate") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("dictate_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("Ignoring malformed config {}: {}", self.path.display(), e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
