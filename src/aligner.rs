use crate::normalize::{normalize_for_comparison, sanitize_word_for_comparison, tokenize};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WordStatus {
    Correct,
    Error,
    Upcoming,
}

/// Status of one expected token, keeping the token exactly as written in the sentence
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WordState {
    pub word: String,
    pub status: WordStatus,
}

/// First divergence between the sentence and the typed text.
///
/// An empty `expected` marks an extra word typed past the end of the sentence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub expected: String,
    pub typed: String,
}

impl Mismatch {
    pub fn is_insertion(&self) -> bool {
        self.expected.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub word_states: Vec<WordState>,
    pub mismatch: Option<Mismatch>,
}

impl Alignment {
    pub fn error_index(&self) -> Option<usize> {
        self.word_states
            .iter()
            .position(|state| state.status == WordStatus::Error)
    }

    pub fn correct_count(&self) -> usize {
        self.word_states
            .iter()
            .filter(|state| state.status == WordStatus::Correct)
            .count()
    }
}

/// Align typed text against the expected sentence, word by word and strictly by position.
///
/// Each expected word consumes at most one typed word, so a substitution leaves the
/// cursor in step with the sentence. Running out of typed words is not an error: the
/// remaining words are simply `Upcoming`.
pub fn align(expected: &str, typed: &str) -> Alignment {
    let target_words = tokenize(expected);
    let typed_words = tokenize(typed.trim());

    let mut mismatch: Option<Mismatch> = None;
    let mut typed_index = 0;

    let word_states = target_words
        .iter()
        .map(|&word| {
            let status = if mismatch.is_some() {
                WordStatus::Upcoming
            } else {
                let clean_target = sanitize_word_for_comparison(word);

                if clean_target.is_empty() {
                    // punctuation-only tokens in the sentence never consume input
                    WordStatus::Correct
                } else {
                    while typed_index < typed_words.len()
                        && sanitize_word_for_comparison(typed_words[typed_index]).is_empty()
                    {
                        typed_index += 1;
                    }

                    match typed_words.get(typed_index) {
                        None => WordStatus::Upcoming,
                        Some(&typed_word) => {
                            typed_index += 1;
                            if sanitize_word_for_comparison(typed_word) == clean_target {
                                WordStatus::Correct
                            } else {
                                mismatch = Some(Mismatch {
                                    expected: word.to_string(),
                                    typed: typed_word.to_string(),
                                });
                                WordStatus::Error
                            }
                        }
                    }
                }
            };

            WordState {
                word: word.to_string(),
                status,
            }
        })
        .collect::<Vec<_>>();

    if mismatch.is_none() {
        mismatch = typed_words
            .iter()
            .skip(typed_index)
            .find(|extra| !sanitize_word_for_comparison(extra).is_empty())
            .map(|extra| Mismatch {
                expected: String::new(),
                typed: extra.to_string(),
            });
    }

    Alignment {
        word_states,
        mismatch,
    }
}

/// Whole-sentence completion check, independent of `align`.
pub fn is_complete(expected: &str, typed: &str) -> bool {
    let expected = normalize_for_comparison(expected);
    !expected.is_empty() && expected == normalize_for_comparison(typed)
}
