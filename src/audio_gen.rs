use crate::util::split_command;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const MAX_STEM_CHARS: usize = 50;

static RESERVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("reserved filename pattern is valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(thiserror::Error, Debug)]
pub enum AudioGenError {
    #[error("audio generator command is empty")]
    EmptyCommand,
    #[error("unable to run audio generator: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio generator exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("audio generator produced no file at {0}")]
    MissingOutput(PathBuf),
}

/// File name for a sentence's audio: reserved characters dropped, whitespace runs
/// become `_`, at most 50 characters, `default` when nothing is left.
pub fn valid_audio_filename(text: &str) -> String {
    let cleaned = RESERVED.replace_all(text, "");
    let underscored = WHITESPACE.replace_all(&cleaned, "_");
    let stem: String = underscored.chars().take(MAX_STEM_CHARS).collect();
    if stem.is_empty() {
        "default.wav".to_string()
    } else {
        format!("{stem}.wav")
    }
}

/// Runs `<command> <text> <output>` to produce a WAV for a new sentence.
#[derive(Debug, Clone)]
pub struct AudioGenerator {
    command: String,
    out_dir: PathBuf,
}

impl AudioGenerator {
    pub fn new(command: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn generate(&self, text: &str) -> Result<PathBuf, AudioGenError> {
        let (program, args) = split_command(&self.command).ok_or(AudioGenError::EmptyCommand)?;
        std::fs::create_dir_all(&self.out_dir)?;
        let output = self.out_dir.join(valid_audio_filename(text));

        info!("Generating audio for text: {}", text);
        debug!("Running {} -> {}", self.command, output.display());
        let status = Command::new(program)
            .args(args)
            .arg(text)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(AudioGenError::Failed(status));
        }
        if !output.exists() {
            return Err(AudioGenError::MissingOutput(output));
        }
        Ok(output)
    }
}
