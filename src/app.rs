use crate::audio::{AudioCues, AudioDevice};
use crate::config::{Config, ConfigStore, Preferences};
use crate::confetti::Celebrations;
use crate::practice::{Practice, PracticeEvent};
use crate::playback::Speaker;
use crate::sentences::{export_json, parse_import, ImportResult};
use crate::store::SentenceSource;
use crate::timer::CancellableTimer;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const STATUS_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Info,
}

#[derive(Debug)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    timer: CancellableTimer,
}

/// Everything the dictation screen needs: the practice session plus its collaborators.
pub struct App<P: Speaker, D: AudioDevice> {
    practice: Practice,
    store: Box<dyn SentenceSource>,
    config_store: Box<dyn ConfigStore>,
    config: Config,
    speaker: P,
    cues: AudioCues<D>,
    celebrations: Celebrations,
    status: Option<StatusMessage>,
    transfer_path: PathBuf,
    show_help: bool,
    should_quit: bool,
}

impl<P: Speaker, D: AudioDevice> App<P, D> {
    /// A store that cannot be read is treated as an empty bank.
    pub fn new(
        store: Box<dyn SentenceSource>,
        config_store: Box<dyn ConfigStore>,
        speaker: P,
        device: D,
        transfer_path: impl Into<PathBuf>,
    ) -> Self {
        let config = config_store.load();
        let sentences = store.list().unwrap_or_else(|e| {
            error!("Unable to load sentences: {}", e);
            Vec::new()
        });
        info!("Loaded {} sentences", sentences.len());

        let practice = Practice::new(sentences, config.current_index);
        let cues = AudioCues::new(device, config.preferences);

        Self {
            practice,
            store,
            config_store,
            config,
            speaker,
            cues,
            celebrations: Celebrations::new(),
            status: None,
            transfer_path: transfer_path.into(),
            show_help: false,
            should_quit: false,
        }
    }

    /// Read the first sentence aloud.
    pub fn start(&mut self, now: Instant) {
        let events = self.practice.replay();
        self.dispatch(events, now);
    }

    pub fn practice(&self) -> &Practice {
        &self.practice
    }

    pub fn preferences(&self) -> Preferences {
        self.config.preferences
    }

    pub fn celebrations(&self) -> &Celebrations {
        &self.celebrations
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn speaker(&self) -> &P {
        &self.speaker
    }

    pub fn cues(&self) -> &AudioCues<D> {
        &self.cues
    }

    pub fn store(&self) -> &dyn SentenceSource {
        self.store.as_ref()
    }

    pub fn transfer_path(&self) -> &Path {
        &self.transfer_path
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('r') if ctrl => self.replay(now),
            KeyCode::Char('n') if ctrl => self.skip(now),
            KeyCode::Tab | KeyCode::PageDown => self.skip(now),
            KeyCode::BackTab | KeyCode::PageUp => {
                let events = self.practice.previous();
                self.dispatch(events, now);
            }
            KeyCode::Char('d') if ctrl => self.master_current(now),
            KeyCode::Char('p') if ctrl => self.toggle_completion_sound(now),
            KeyCode::Char('k') if ctrl => self.toggle_keypress_sound(now),
            KeyCode::Char('e') if ctrl => {
                let path = self.transfer_path.clone();
                self.export_to(&path, now);
            }
            KeyCode::Char('o') if ctrl => {
                let path = self.transfer_path.clone();
                self.import_from(&path, now);
            }
            KeyCode::Char('u') if ctrl => self.set_input(String::new(), now),
            KeyCode::Char('w') if ctrl => self.delete_word(now),
            KeyCode::F(1) => self.show_help = !self.show_help,
            KeyCode::Backspace => self.backspace(now),
            KeyCode::Char(c) if !ctrl && !alt => self.type_char(c, now),
            _ => {}
        }
    }

    pub fn handle_paste(&mut self, text: &str, now: Instant) {
        let mut value = self.practice.input().to_string();
        value.push_str(text);
        self.set_input(value, now);
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.celebrations.update(now);
        let expired = self
            .status
            .as_mut()
            .is_some_and(|status| status.timer.poll(now));
        if expired {
            self.status = None;
        }
    }

    /// Something on screen is moving, so the loop should redraw on ticks.
    pub fn is_animating(&self) -> bool {
        self.celebrations.is_active()
    }

    pub fn type_char(&mut self, c: char, now: Instant) {
        self.cues.play_keypress();
        let mut value = self.practice.input().to_string();
        value.push(c);
        self.set_input(value, now);
    }

    pub fn backspace(&mut self, now: Instant) {
        if self.practice.input().is_empty() {
            return;
        }
        self.cues.play_keypress();
        let mut value = self.practice.input().to_string();
        value.pop();
        self.set_input(value, now);
    }

    fn delete_word(&mut self, now: Instant) {
        let trimmed = self.practice.input().trim_end();
        let keep = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let value = trimmed[..keep].to_string();
        self.set_input(value, now);
    }

    pub fn set_input(&mut self, value: String, now: Instant) {
        let events = self.practice.set_input(value);
        self.dispatch(events, now);
    }

    pub fn skip(&mut self, now: Instant) {
        let events = self.practice.skip();
        self.dispatch(events, now);
    }

    pub fn replay(&mut self, now: Instant) {
        let events = self.practice.replay();
        self.dispatch(events, now);
    }

    /// The sentence leaves the bank only once the store has forgotten it.
    pub fn master_current(&mut self, now: Instant) {
        let Some(id) = self.practice.current().map(|s| s.id.clone()) else {
            return;
        };
        if let Err(e) = self.store.delete(&id) {
            error!("Unable to delete sentence {}: {}", id, e);
            self.set_status(StatusKind::Error, "Unable to remove the sentence.", now);
            return;
        }
        let events = self.practice.master_current();
        self.dispatch(events, now);
    }

    pub fn toggle_completion_sound(&mut self, now: Instant) {
        let prefs = &mut self.config.preferences;
        prefs.completion_sound = !prefs.completion_sound;
        let label = on_off(prefs.completion_sound);
        self.apply_preferences();
        self.set_status(StatusKind::Info, format!("Completion sound {label}"), now);
    }

    pub fn toggle_keypress_sound(&mut self, now: Instant) {
        let prefs = &mut self.config.preferences;
        prefs.keypress_sound = !prefs.keypress_sound;
        let label = on_off(prefs.keypress_sound);
        self.apply_preferences();
        self.set_status(StatusKind::Info, format!("Keypress sound {label}"), now);
    }

    fn apply_preferences(&mut self) {
        self.cues.set_preferences(self.config.preferences);
        self.persist_config();
    }

    pub fn export_to(&mut self, path: &Path, now: Instant) {
        let result = export_json(self.practice.sentences())
            .map_err(std::io::Error::from)
            .and_then(|json| std::fs::write(path, json));
        match result {
            Ok(()) => {
                info!("Exported {} sentences to {}", self.practice.len(), path.display());
                self.set_status(
                    StatusKind::Success,
                    format!("Exported {} to {}", plural(self.practice.len()), path.display()),
                    now,
                );
            }
            Err(e) => {
                error!("Unable to export sentences: {}", e);
                self.set_status(StatusKind::Error, format!("Export failed: {e}"), now);
            }
        }
    }

    pub fn import_from(&mut self, path: &Path, now: Instant) {
        let parsed = match std::fs::read_to_string(path) {
            Ok(raw) => parse_import(&raw),
            Err(e) => ImportResult::Invalid(e.into()),
        };

        let sentences = match parsed {
            ImportResult::Valid(sentences) => sentences,
            ImportResult::Invalid(reason) => {
                error!("Unable to import sentences from {}: {}", path.display(), reason);
                self.set_status(
                    StatusKind::Error,
                    "Import failed. Please choose a JSON file exported from this app.",
                    now,
                );
                return;
            }
        };

        if let Err(e) = self.store.replace_all(&sentences) {
            error!("Unable to save imported sentences: {}", e);
            self.set_status(
                StatusKind::Error,
                "Import failed. The sentences could not be saved.",
                now,
            );
            return;
        }
        let count = sentences.len();
        let events = self.practice.replace_all(sentences);
        self.dispatch(events, now);
        self.set_status(
            StatusKind::Success,
            format!("Imported {} successfully.", plural(count)),
            now,
        );
    }

    /// Replaces any message still showing, along with its timeout.
    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>, now: Instant) {
        if let Some(mut previous) = self.status.take() {
            previous.timer.cancel();
        }
        self.status = Some(StatusMessage {
            kind,
            text: text.into(),
            timer: CancellableTimer::new(now, STATUS_TIMEOUT),
        });
    }

    fn dispatch(&mut self, events: Vec<PracticeEvent>, now: Instant) {
        for event in events {
            match event {
                PracticeEvent::Completed { seed } => {
                    debug!("Sentence completed, celebrating with seed {}", seed);
                    self.cues.play_completion();
                    self.celebrations.trigger(seed, now);
                }
                PracticeEvent::Speak { text, audio_url } => {
                    if let Err(e) = self.speaker.speak(&text, audio_url.as_deref()) {
                        debug!("Playback skipped: {}", e);
                    }
                }
                PracticeEvent::IndexChanged(index) => {
                    self.config.current_index = index;
                    self.persist_config();
                }
                PracticeEvent::Removed(sentence) => {
                    info!("Removed sentence {}", sentence.id);
                }
            }
        }
    }

    fn persist_config(&self) {
        if let Err(e) = self.config_store.save(&self.config) {
            warn!("Unable to save config: {}", e);
        }
    }

    /// Stop playback, close audio and save state.
    pub fn dispose(&mut self) {
        self.speaker.stop();
        self.cues.dispose();
        self.celebrations.clear();
        self.persist_config();
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn plural(count: usize) -> String {
    format!("{count} sentence{}", if count == 1 { "" } else { "s" })
}
