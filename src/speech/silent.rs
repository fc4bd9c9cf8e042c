use std::sync::mpsc::Sender;

use tracing::debug;

use crate::speech::{Recognizer, SessionId, SpeechError, SpeechEvent, Synthesizer, UtteranceId};

/// Stands in when no speech program is installed: logs the text and reports
/// completion straight away.
pub struct SilentSynthesizer {
    events: Sender<SpeechEvent>,
}

impl SilentSynthesizer {
    pub fn new(events: Sender<SpeechEvent>) -> Self {
        Self { events }
    }
}

impl Synthesizer for SilentSynthesizer {
    fn speak(&mut self, text: &str, id: UtteranceId) {
        debug!(text, "speech output unavailable");
        let _ = self.events.send(SpeechEvent::UtteranceEnded(id));
    }

    fn cancel(&mut self) {}
}

/// Recognizer used when no dictation program is configured.
pub struct NoRecognizer;

impl Recognizer for NoRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self, _session: SessionId) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn stop(&mut self) {}
}
