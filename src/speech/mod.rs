//! Speech collaborators: text-to-speech output and streaming dictation input.
//!
//! Both sides are asynchronous. Calls on the traits return immediately and
//! their outcome arrives later as a [`SpeechEvent`] on the application's event
//! channel, tagged with the utterance or session id the caller supplied so
//! stale notifications can be told apart from current ones.

pub mod command;
pub mod dictation;
pub mod silent;

use std::fmt;
use std::io;

use thiserror::Error;

use crate::engine::transcript::TranscriptSegment;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no speech program is available")]
    Unavailable,
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Error codes a recognizer can report, named after the codes browsers use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    NotAllowed,
    ServiceNotAllowed,
    NoSpeech,
    Aborted,
    Network,
    Other(String),
}

impl RecognitionErrorCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::Network => "network",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for RecognitionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechEvent {
    UtteranceEnded(UtteranceId),
    RecognitionStarted(SessionId),
    RecognitionResult {
        session: SessionId,
        segments: Vec<TranscriptSegment>,
    },
    RecognitionEnded(SessionId),
    RecognitionError {
        session: SessionId,
        code: RecognitionErrorCode,
    },
}

/// Voice parameters handed to a synthesizer.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceSettings {
    pub voice: Option<String>,
    /// 1.0 is the program's normal speed.
    pub rate: f32,
    /// 1.0 is the program's normal pitch.
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 0.9,
            pitch: 1.0,
        }
    }
}

pub trait Synthesizer {
    /// Cancel whatever is playing and start speaking `text`. Completion is
    /// reported as [`SpeechEvent::UtteranceEnded`] with `id`; an utterance
    /// that gets replaced may or may not report.
    fn speak(&mut self, text: &str, id: UtteranceId);

    fn cancel(&mut self);
}

pub trait Recognizer {
    fn is_supported(&self) -> bool;

    /// Begin a continuous dictation session. The session reports
    /// `RecognitionStarted`, any number of results and errors, then
    /// `RecognitionEnded`.
    fn start(&mut self, session: SessionId) -> Result<(), SpeechError>;

    fn stop(&mut self);
}

impl<S: Synthesizer + ?Sized> Synthesizer for Box<S> {
    fn speak(&mut self, text: &str, id: UtteranceId) {
        (**self).speak(text, id)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn start(&mut self, session: SessionId) -> Result<(), SpeechError> {
        (**self).start(session)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Look a program up on `PATH`; absolute or relative paths are checked directly.
pub fn find_program(program: &str) -> Option<std::path::PathBuf> {
    let candidate = std::path::Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}
