use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::speech::{SpeechError, SpeechEvent, Synthesizer, UtteranceId, VoiceSettings, find_program};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Programs probed, in order, when no command is configured.
pub const KNOWN_PROGRAMS: [&str; 4] = ["espeak-ng", "espeak", "say", "spd-say"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flavor {
    Espeak,
    Say,
    SpdSay,
    /// Unknown program: the text is passed as the only argument.
    Plain,
}

impl Flavor {
    fn detect(program: &str) -> Self {
        let name = std::path::Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        match name {
            "espeak" | "espeak-ng" => Flavor::Espeak,
            "say" => Flavor::Say,
            "spd-say" => Flavor::SpdSay,
            _ => Flavor::Plain,
        }
    }
}

/// Speaks through a system TTS program, one child process per utterance.
///
/// Each utterance gets a watcher thread that polls its child. Starting a new
/// utterance bumps the generation counter, which makes the previous watcher
/// kill its child and exit without reporting.
pub struct CommandSynthesizer {
    program: PathBuf,
    flavor: Flavor,
    voice: VoiceSettings,
    generation: Arc<AtomicU64>,
    events: Sender<SpeechEvent>,
}

impl CommandSynthesizer {
    pub fn new(program: PathBuf, voice: VoiceSettings, events: Sender<SpeechEvent>) -> Self {
        let flavor = Flavor::detect(&program.to_string_lossy());
        Self {
            program,
            flavor,
            voice,
            generation: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Use `configured` if given, otherwise the first known program on `PATH`.
    pub fn discover(
        configured: Option<&str>,
        voice: VoiceSettings,
        events: Sender<SpeechEvent>,
    ) -> Result<Self, SpeechError> {
        let program = match configured {
            Some(name) => find_program(name),
            None => KNOWN_PROGRAMS.iter().find_map(|name| find_program(name)),
        }
        .ok_or(SpeechError::Unavailable)?;
        debug!(program = %program.display(), "using speech program");
        Ok(Self::new(program, voice, events))
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    fn build_command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        let rate = self.voice.rate.clamp(0.1, 4.0);
        let pitch = self.voice.pitch.clamp(0.0, 2.0);
        match self.flavor {
            Flavor::Espeak => {
                cmd.arg("-s").arg(format!("{}", (175.0 * rate).round() as u32));
                cmd.arg("-p").arg(format!("{}", (50.0 * pitch).round() as u32));
                if let Some(ref voice) = self.voice.voice {
                    cmd.arg("-v").arg(voice);
                }
                cmd.arg("--").arg(text);
            }
            Flavor::Say => {
                cmd.arg("-r").arg(format!("{}", (180.0 * rate).round() as u32));
                if let Some(ref voice) = self.voice.voice {
                    cmd.arg("-v").arg(voice);
                }
                cmd.arg("--").arg(text);
            }
            Flavor::SpdSay => {
                // spd-say rates and pitches run -100..=100 around 0.
                let rate = ((rate - 1.0) * 100.0).clamp(-100.0, 100.0).round() as i32;
                let pitch = ((pitch - 1.0) * 100.0).clamp(-100.0, 100.0).round() as i32;
                cmd.arg("-w");
                cmd.arg("-r").arg(rate.to_string());
                cmd.arg("-p").arg(pitch.to_string());
                if let Some(ref voice) = self.voice.voice {
                    cmd.arg("-y").arg(voice);
                }
                cmd.arg("--").arg(text);
            }
            Flavor::Plain => {
                cmd.arg(text);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl Synthesizer for CommandSynthesizer {
    fn speak(&mut self, text: &str, id: UtteranceId) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if text.trim().is_empty() {
            let _ = self.events.send(SpeechEvent::UtteranceEnded(id));
            return;
        }

        let mut child = match self.build_command(text).spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = SpeechError::Spawn {
                    program: self.program.display().to_string(),
                    source,
                };
                warn!("speech output failed: {err}");
                // Report completion anyway so whoever waits on it is not stuck.
                let _ = self.events.send(SpeechEvent::UtteranceEnded(id));
                return;
            }
        };

        let current = Arc::clone(&self.generation);
        let events = self.events.clone();
        thread::spawn(move || {
            loop {
                if current.load(Ordering::SeqCst) != generation {
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
                match child.try_wait() {
                    Ok(Some(status)) => {
                        if !status.success() {
                            debug!(%status, "speech program exited with failure");
                        }
                        if current.load(Ordering::SeqCst) == generation {
                            let _ = events.send(SpeechEvent::UtteranceEnded(id));
                        }
                        return;
                    }
                    Ok(None) => thread::sleep(POLL_INTERVAL),
                    Err(e) => {
                        warn!("lost track of speech program: {e}");
                        let _ = events.send(SpeechEvent::UtteranceEnded(id));
                        return;
                    }
                }
            }
        });
    }

    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
