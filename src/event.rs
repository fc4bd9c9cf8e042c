use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

use spellmaster::speech::SpeechEvent;

pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Resize,
    Speech(SpeechEvent),
}

/// Funnels terminal input, speech notifications and ticks into one channel so
/// the main loop handles them in arrival order.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    speech_tx: mpsc::Sender<SpeechEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        let input_tx = tx.clone();
        thread::spawn(move || {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    let sent = match event::read() {
                        Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                            input_tx.send(AppEvent::Key(key))
                        }
                        Ok(Event::Resize(..)) => input_tx.send(AppEvent::Resize),
                        _ => Ok(()),
                    };
                    if sent.is_err() {
                        return;
                    }
                } else if input_tx.send(AppEvent::Tick).is_err() {
                    return;
                }
            }
        });

        let (speech_tx, speech_rx) = mpsc::channel::<SpeechEvent>();
        thread::spawn(move || {
            for event in speech_rx {
                if tx.send(AppEvent::Speech(event)).is_err() {
                    return;
                }
            }
        });

        Self { rx, speech_tx }
    }

    /// Handed to speech backends; their reports arrive as [`AppEvent::Speech`].
    pub fn speech_sender(&self) -> mpsc::Sender<SpeechEvent> {
        self.speech_tx.clone()
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}
