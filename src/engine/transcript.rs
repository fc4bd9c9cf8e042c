use serde::{Deserialize, Serialize};

/// How recognized fragments are told apart from incidental full words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterPolicy {
    /// Only single letters count.
    #[default]
    Strict,
    /// Spoken letter names ("see", "bee") map to their letter and any other
    /// chunk of up to four letters is taken as dictated letters.
    Permissive,
}

const PERMISSIVE_MAX_CHUNK: usize = 4;

// Recognizers often transcribe a dictated letter as its homophone.
const LETTER_NAMES: &[(&str, char)] = &[
    ("ay", 'a'),
    ("bee", 'b'),
    ("be", 'b'),
    ("see", 'c'),
    ("sea", 'c'),
    ("cee", 'c'),
    ("dee", 'd'),
    ("ee", 'e'),
    ("ef", 'f'),
    ("eff", 'f'),
    ("gee", 'g'),
    ("aitch", 'h'),
    ("eye", 'i'),
    ("jay", 'j'),
    ("kay", 'k'),
    ("el", 'l'),
    ("ell", 'l'),
    ("em", 'm'),
    ("en", 'n'),
    ("oh", 'o'),
    ("owe", 'o'),
    ("pee", 'p'),
    ("pea", 'p'),
    ("cue", 'q'),
    ("queue", 'q'),
    ("are", 'r'),
    ("ar", 'r'),
    ("es", 's'),
    ("ess", 's'),
    ("tee", 't'),
    ("tea", 't'),
    ("you", 'u'),
    ("vee", 'v'),
    ("ex", 'x'),
    ("why", 'y'),
    ("wye", 'y'),
    ("zee", 'z'),
    ("zed", 'z'),
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tokens {
    pub letters: Vec<String>,
    pub long_words: Vec<String>,
}

impl Tokens {
    pub fn joined_letters(&self) -> String {
        self.letters.concat()
    }
}

/// Split a transcript on whitespace, strip everything but ASCII letters from
/// each token, and sort the survivors into letters and long words.
pub fn classify(transcript: &str, policy: LetterPolicy) -> Tokens {
    let mut tokens = Tokens::default();
    for raw in transcript.split_whitespace() {
        let token: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if token.is_empty() {
            continue;
        }

        match policy {
            LetterPolicy::Strict => {
                if token.len() == 1 {
                    tokens.letters.push(token);
                } else {
                    tokens.long_words.push(token);
                }
            }
            LetterPolicy::Permissive => {
                if let Some(letter) = letter_name(&token) {
                    tokens.letters.push(letter.to_string());
                } else if token.len() <= PERMISSIVE_MAX_CHUNK {
                    tokens.letters.push(token);
                } else {
                    tokens.long_words.push(token);
                }
            }
        }
    }
    tokens
}

fn letter_name(token: &str) -> Option<char> {
    LETTER_NAMES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|&(_, letter)| letter)
}

/// One recognizer result: a transcript and whether it will be revised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Letters dictated so far for the current answer.
#[derive(Clone, Debug, Default)]
pub struct Dictation {
    committed: String,
    last_display: String,
}

impl Dictation {
    pub fn letters(&self) -> &str {
        &self.committed
    }

    pub fn display(&self) -> &str {
        &self.last_display
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.last_display.clear();
    }

    /// Fold a batch of recognizer segments into the answer. Finals commit
    /// their letter tokens; interims made only of letters are previewed after
    /// the committed text; other interims are dropped and leave the display
    /// as it was. Returns the new display when it changed.
    pub fn apply(&mut self, segments: &[TranscriptSegment], policy: LetterPolicy) -> Option<String> {
        let mut preview = String::new();
        let mut touched = false;

        for segment in segments {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            let tokens = classify(text, policy);

            if segment.is_final {
                if !tokens.long_words.is_empty() {
                    tracing::debug!(words = ?tokens.long_words, "ignoring full words in final transcript");
                }
                self.committed.push_str(&tokens.joined_letters());
                preview.clear();
                touched = true;
            } else if !tokens.letters.is_empty() && tokens.long_words.is_empty() {
                preview = tokens.joined_letters();
                touched = true;
            }
        }
        if !touched {
            return None;
        }

        let display = format!("{}{}", self.committed, preview);
        if display == self.last_display {
            return None;
        }
        self.last_display = display.clone();
        Some(display)
    }
}
