use crate::audio_gen::AudioGenerator;
use crate::sentences::{default_sentences, make_id, Sentence};
use chrono::Local;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA_VERSION: i32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("unable to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no sentence with id '{0}'")]
    NotFound(String),
}

/// Where the sentence bank lives. Order is part of the data.
pub trait SentenceSource {
    fn list(&self) -> Result<Vec<Sentence>, StoreError>;
    /// Append at the end of the bank.
    fn add(&mut self, sentence: &Sentence) -> Result<(), StoreError>;
    /// Replace text and audio of the sentence with the same id.
    fn update(&mut self, sentence: &Sentence) -> Result<(), StoreError>;
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
    /// Apply the order of `ids`; every id must exist.
    fn reorder(&mut self, ids: &[String]) -> Result<(), StoreError>;
    fn replace_all(&mut self, sentences: &[Sentence]) -> Result<(), StoreError>;
}

/// SQLite-backed sentence bank
#[derive(Debug)]
pub struct SqliteSentenceStore {
    conn: Connection,
}

impl SqliteSentenceStore {
    /// Open (creating if needed) the database at `path`. A brand new database is
    /// seeded with the default sentences.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened sentence store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sentences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sentence_id TEXT NOT NULL UNIQUE,
                sentence_text TEXT NOT NULL,
                sentence_order INTEGER NOT NULL,
                audio_url TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sentences_order ON sentences(sentence_order)",
            [],
        )?;

        let mut store = SqliteSentenceStore { conn };
        if version < SCHEMA_VERSION {
            if store.count()? == 0 {
                info!("Seeding new sentence store with default sentences");
                store.replace_all(&default_sentences())?;
            }
            store
                .conn
                .execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
        }
        Ok(store)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sentences", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn get(&self, id: &str) -> Result<Option<Sentence>, StoreError> {
        let sentence = self
            .conn
            .query_row(
                "SELECT sentence_id, sentence_text, audio_url FROM sentences WHERE sentence_id = ?1",
                [id],
                |row| {
                    Ok(Sentence {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        audio_url: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(sentence)
    }

    fn next_order(&self) -> Result<i64, StoreError> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(sentence_order) FROM sentences", [], |row| {
                    row.get(0)
                })?;
        Ok(max.map_or(0, |m| m + 1))
    }
}

impl SentenceSource for SqliteSentenceStore {
    fn list(&self) -> Result<Vec<Sentence>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sentence_id, sentence_text, audio_url
            FROM sentences
            ORDER BY sentence_order, id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Sentence {
                id: row.get(0)?,
                text: row.get(1)?,
                audio_url: row.get(2)?,
            })
        })?;

        let mut sentences = Vec::new();
        for sentence in rows {
            sentences.push(sentence?);
        }
        Ok(sentences)
    }

    fn add(&mut self, sentence: &Sentence) -> Result<(), StoreError> {
        let order = self.next_order()?;
        self.conn.execute(
            r#"
            INSERT INTO sentences (sentence_id, sentence_text, sentence_order, audio_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                sentence.id,
                sentence.text,
                order,
                sentence.audio_url,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update(&mut self, sentence: &Sentence) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE sentences SET sentence_text = ?2, audio_url = ?3 WHERE sentence_id = ?1",
            params![sentence.id, sentence.text, sentence.audio_url],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(sentence.id.clone()));
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM sentences WHERE sentence_id = ?1", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn reorder(&mut self, ids: &[String]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for (order, id) in ids.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE sentences SET sentence_order = ?2 WHERE sentence_id = ?1",
                params![id, order as i64],
            )?;
            if changed == 0 {
                // dropping the transaction rolls back
                return Err(StoreError::NotFound(id.clone()));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn replace_all(&mut self, sentences: &[Sentence]) -> Result<(), StoreError> {
        let created_at = Local::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM sentences", [])?;
        for (order, sentence) in sentences.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO sentences (sentence_id, sentence_text, sentence_order, audio_url, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    sentence.id,
                    sentence.text,
                    order as i64,
                    sentence.audio_url,
                    created_at,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Add `text` (trimmed) as a new sentence. Blank text is ignored. With a generator,
/// the sentence gets an audio file; a failed generation still saves the sentence.
pub fn add_sentence(
    store: &mut dyn SentenceSource,
    generator: Option<&AudioGenerator>,
    text: &str,
) -> Result<Option<Sentence>, StoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let audio_url = generator.and_then(|generator| match generator.generate(text) {
        Ok(path) => Some(path.to_string_lossy().into_owned()),
        Err(e) => {
            warn!("Failed to generate audio, saving without it: {}", e);
            None
        }
    });

    let sentence = Sentence::new(make_id(), text).with_audio_url(audio_url);
    store.add(&sentence)?;
    info!("Added sentence {}", sentence.id);
    Ok(Some(sentence))
}

/// Move sentence `id` to position `to` (clamped to the end of the bank).
pub fn move_sentence(store: &mut dyn SentenceSource, id: &str, to: usize) -> Result<(), StoreError> {
    let mut ids: Vec<String> = store.list()?.into_iter().map(|s| s.id).collect();
    let from = ids
        .iter()
        .position(|existing| existing == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    let moved = ids.remove(from);
    ids.insert(to.min(ids.len()), moved);
    store.reorder(&ids)
}
