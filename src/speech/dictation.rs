use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, warn};

use crate::engine::transcript::TranscriptSegment;
use crate::speech::{
    RecognitionErrorCode, Recognizer, SessionId, SpeechError, SpeechEvent, find_program,
};

/// Streams dictation from an external speech-to-text program.
///
/// The program runs for the lifetime of one session and writes one event per
/// line on stdout:
///
/// ```text
/// partial <interim transcript>
/// final <final transcript>
/// error <code>
/// ```
///
/// Closing stdout (or exiting) ends the session. Other lines are ignored.
pub struct CommandRecognizer {
    program: Option<PathBuf>,
    args: Vec<String>,
    events: Sender<SpeechEvent>,
    child: Option<Child>,
}

impl CommandRecognizer {
    /// `command_line` is split on whitespace; the first word is resolved on `PATH`.
    pub fn new(command_line: Option<&str>, events: Sender<SpeechEvent>) -> Self {
        let mut words = command_line.unwrap_or_default().split_whitespace();
        let program = words.next().and_then(find_program);
        if command_line.is_some() && program.is_none() {
            warn!(command = ?command_line, "dictation program not found; speech input disabled");
        }
        Self {
            program,
            args: words.map(str::to_string).collect(),
            events,
            child: None,
        }
    }
}

impl Recognizer for CommandRecognizer {
    fn is_supported(&self) -> bool {
        self.program.is_some()
    }

    fn start(&mut self, session: SessionId) -> Result<(), SpeechError> {
        self.stop();
        let program = self.program.as_ref().ok_or(SpeechError::Unavailable)?;

        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SpeechError::Unavailable);
        };

        let _ = self.events.send(SpeechEvent::RecognitionStarted(session));
        let events = self.events.clone();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                match parse_line(&line, session) {
                    Some(event) => {
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                    None => debug!(%line, "ignoring dictation output"),
                }
            }
            let _ = events.send(SpeechEvent::RecognitionEnded(session));
        });

        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn parse_line(line: &str, session: SessionId) -> Option<SpeechEvent> {
    let line = line.trim();
    let (kind, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match kind {
        "partial" => Some(SpeechEvent::RecognitionResult {
            session,
            segments: vec![TranscriptSegment::interim(rest)],
        }),
        "final" => Some(SpeechEvent::RecognitionResult {
            session,
            segments: vec![TranscriptSegment::final_(rest)],
        }),
        "error" if !rest.is_empty() => Some(SpeechEvent::RecognitionError {
            session,
            code: RecognitionErrorCode::parse(rest),
        }),
        _ => None,
    }
}
