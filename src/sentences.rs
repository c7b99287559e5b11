use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub const EXPORT_FILENAME: &str = "dictate-english-sentences.json";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "audioUrl")]
    pub audio_url: Option<String>,
}

impl Sentence {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            audio_url: None,
        }
    }

    pub fn with_audio_url(mut self, audio_url: Option<String>) -> Self {
        self.audio_url = audio_url;
        self
    }
}

/// The bank a fresh install starts with
pub fn default_sentences() -> Vec<Sentence> {
    vec![
        Sentence::new("s-1", "The quick brown fox jumps over the lazy dog."),
        Sentence::new("s-2", "Please open the window before the rain starts."),
        Sentence::new("s-3", "Travel teaches you what books alone never can."),
    ]
}

/// `s-` followed by 8 random base-36 characters.
pub fn make_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("s-{suffix}")
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("expected a JSON array of sentences")]
    NotAnArray,
    #[error("no valid sentences found")]
    NoValidEntries,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub enum ImportResult {
    Valid(Vec<Sentence>),
    Invalid(ImportError),
}

impl ImportResult {
    pub fn into_result(self) -> Result<Vec<Sentence>, ImportError> {
        match self {
            ImportResult::Valid(sentences) => Ok(sentences),
            ImportResult::Invalid(reason) => Err(reason),
        }
    }
}

pub fn parse_import(raw: &str) -> ImportResult {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_import_value(&value),
        Err(e) => ImportResult::Invalid(ImportError::Json(e)),
    }
}

/// Accepts entries that carry a string `text`; ids are trimmed, and blank, missing
/// or duplicate ids are replaced with fresh ones. Any other field is dropped.
pub fn parse_import_value(value: &Value) -> ImportResult {
    let Some(entries) = value.as_array() else {
        return ImportResult::Invalid(ImportError::NotAnArray);
    };

    let mut seen = HashSet::new();
    let mut sanitized = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(object) = entry.as_object() else {
            continue;
        };
        let Some(text) = object.get("text").and_then(Value::as_str) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }

        let mut id = match object.get("id").and_then(Value::as_str).map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => make_id(),
        };
        while seen.contains(&id) {
            id = make_id();
        }

        seen.insert(id.clone());
        sanitized.push(Sentence::new(id, text));
    }

    if !entries.is_empty() && sanitized.is_empty() {
        return ImportResult::Invalid(ImportError::NoValidEntries);
    }
    ImportResult::Valid(sanitized)
}

#[derive(Serialize)]
struct ExportEntry<'a> {
    id: &'a str,
    text: &'a str,
}

/// Pretty-printed `[{id, text}, ...]`, the same shape `parse_import` reads back.
pub fn export_json(sentences: &[Sentence]) -> Result<String, serde_json::Error> {
    let entries: Vec<ExportEntry> = sentences
        .iter()
        .map(|s| ExportEntry {
            id: &s.id,
            text: &s.text,
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}
