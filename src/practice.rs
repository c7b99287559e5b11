use crate::aligner::{align, is_complete, Alignment};
use crate::sentences::{make_id, Sentence};

/// Side effects requested by the controller. The caller dispatches them without
/// waiting; none of them feed back into the controller's state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PracticeEvent {
    /// The current sentence was typed correctly. `seed` drives the confetti layout.
    Completed { seed: String },
    Speak {
        text: String,
        audio_url: Option<String>,
    },
    IndexChanged(usize),
    Removed(Sentence),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CurrentKey {
    index: usize,
    id: String,
    text: String,
    audio_url: Option<String>,
}

/// Session state: the sentence bank, which sentence is up, and what has been typed.
#[derive(Debug, Clone)]
pub struct Practice {
    sentences: Vec<Sentence>,
    current_index: usize,
    input: String,
    alignment: Alignment,
}

impl Practice {
    /// `stored_index` is clamped into range, so a stale persisted index is harmless.
    pub fn new(sentences: Vec<Sentence>, stored_index: usize) -> Self {
        let mut practice = Self {
            sentences,
            current_index: stored_index,
            input: String::new(),
            alignment: Alignment::default(),
        };
        practice.clamp_index();
        practice.realign();
        practice
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&Sentence> {
        self.sentences.get(self.current_index)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn alignment(&self) -> &Alignment {
        &self.alignment
    }

    pub fn position_label(&self) -> String {
        if self.sentences.is_empty() {
            "No sentences".to_string()
        } else {
            format!("Sentence {} of {}", self.current_index + 1, self.sentences.len())
        }
    }

    /// Replace the input buffer. A buffer that matches the current sentence completes it.
    pub fn set_input(&mut self, value: impl Into<String>) -> Vec<PracticeEvent> {
        let before = self.current_key();
        self.input = value.into();

        let mut events = Vec::new();
        let completed = self
            .current()
            .is_some_and(|sentence| is_complete(&sentence.text, &self.input));
        if completed {
            events.push(PracticeEvent::Completed { seed: make_id() });
            self.input.clear();
            self.advance();
        }

        self.settle(before, &mut events);
        events
    }

    /// Move on without celebrating.
    pub fn skip(&mut self) -> Vec<PracticeEvent> {
        let before = self.current_key();
        self.advance();
        let mut events = Vec::new();
        self.settle(before, &mut events);
        events
    }

    /// Jump to `index`; out of range jumps are ignored.
    pub fn select(&mut self, index: usize) -> Vec<PracticeEvent> {
        if index >= self.sentences.len() {
            return Vec::new();
        }
        let before = self.current_key();
        self.current_index = index;
        let mut events = Vec::new();
        self.settle(before, &mut events);
        events
    }

    pub fn previous(&mut self) -> Vec<PracticeEvent> {
        match self.sentences.len() {
            0 => Vec::new(),
            len => self.select((self.current_index + len - 1) % len),
        }
    }

    pub fn replay(&self) -> Vec<PracticeEvent> {
        self.current()
            .map(|sentence| PracticeEvent::Speak {
                text: sentence.text.clone(),
                audio_url: sentence.audio_url.clone(),
            })
            .into_iter()
            .collect()
    }

    /// Drop the current sentence from the bank; the next one takes its place.
    pub fn master_current(&mut self) -> Vec<PracticeEvent> {
        let Some(id) = self.current().map(|s| s.id.clone()) else {
            return Vec::new();
        };
        let events = self.remove(&id);
        self.input.clear();
        self.realign();
        events
    }

    pub fn remove(&mut self, id: &str) -> Vec<PracticeEvent> {
        let Some(position) = self.sentences.iter().position(|s| s.id == id) else {
            return Vec::new();
        };
        let before = self.current_key();
        let removed = self.sentences.remove(position);
        if position < self.current_index {
            self.current_index -= 1;
        }
        self.clamp_index();

        let mut events = vec![PracticeEvent::Removed(removed)];
        self.settle(before, &mut events);
        events
    }

    /// Swap in a whole new bank (import). Starts over from the first sentence.
    pub fn replace_all(&mut self, sentences: Vec<Sentence>) -> Vec<PracticeEvent> {
        let before = self.current_key();
        self.sentences = sentences;
        self.current_index = 0;
        self.input.clear();

        let mut events = Vec::new();
        self.settle(before, &mut events);
        events
    }

    pub fn add(&mut self, sentence: Sentence) -> Vec<PracticeEvent> {
        let before = self.current_key();
        self.sentences.push(sentence);
        let mut events = Vec::new();
        self.settle(before, &mut events);
        events
    }

    pub fn update_text(&mut self, id: &str, text: impl Into<String>) -> Vec<PracticeEvent> {
        let before = self.current_key();
        if let Some(sentence) = self.sentences.iter_mut().find(|s| s.id == id) {
            sentence.text = text.into();
        }
        let mut events = Vec::new();
        self.settle(before, &mut events);
        events
    }

    fn advance(&mut self) {
        if self.sentences.is_empty() {
            self.current_index = 0;
        } else {
            self.current_index = (self.current_index + 1) % self.sentences.len();
        }
    }

    fn clamp_index(&mut self) {
        if self.current_index >= self.sentences.len() {
            self.current_index = self.sentences.len().saturating_sub(1);
        }
    }

    fn current_key(&self) -> Option<CurrentKey> {
        self.current().map(|sentence| CurrentKey {
            index: self.current_index,
            id: sentence.id.clone(),
            text: sentence.text.clone(),
            audio_url: sentence.audio_url.clone(),
        })
    }

    // Reacts to whatever changed about the current sentence: a different sentence
    // starts with an empty buffer, and new text or audio is read aloud.
    fn settle(&mut self, before: Option<CurrentKey>, events: &mut Vec<PracticeEvent>) {
        let after = self.current_key();

        let old_index = before.as_ref().map_or(0, |k| k.index);
        if old_index != self.current_index {
            events.push(PracticeEvent::IndexChanged(self.current_index));
        }

        let old_id = before.as_ref().map(|k| k.id.as_str());
        let new_id = after.as_ref().map(|k| k.id.as_str());
        if old_id != new_id {
            self.input.clear();
        }

        let old_spoken = before.as_ref().map(|k| (&k.text, &k.audio_url));
        let new_spoken = after.as_ref().map(|k| (&k.text, &k.audio_url));
        if old_spoken != new_spoken {
            if let Some(key) = &after {
                events.push(PracticeEvent::Speak {
                    text: key.text.clone(),
                    audio_url: key.audio_url.clone(),
                });
            }
        }

        self.realign();
    }

    fn realign(&mut self) {
        self.alignment = match self.current() {
            Some(sentence) => align(&sentence.text, &self.input),
            None => Alignment::default(),
        };
    }
}
