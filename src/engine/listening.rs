use crate::speech::{RecognitionErrorCode, SessionId};

/// Automatic restarts stop once this many unexplained errors happen in a row.
pub const RESTART_CEILING: u32 = 3;

/// Lifecycle of one dictation session. "Idle" is the absence of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenState {
    /// Asked the recognizer to start, waiting for acknowledgement.
    Starting,
    Listening,
    /// We asked it to stop; late results may still arrive, the end never restarts.
    Stopping,
    /// The recognizer reported an error and is expected to end on its own.
    Failed,
}

#[derive(Debug)]
pub struct ListeningSession {
    id: SessionId,
    state: ListenState,
}

impl ListeningSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: ListenState::Starting,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ListenState::Starting | ListenState::Listening)
    }

    pub fn accepts_results(&self) -> bool {
        self.state != ListenState::Failed
    }

    pub fn mark_started(&mut self) {
        if self.state == ListenState::Starting {
            self.state = ListenState::Listening;
        }
    }

    /// Returns false when a stop was already requested.
    pub fn begin_stop(&mut self) -> bool {
        if self.state == ListenState::Stopping {
            return false;
        }
        self.state = ListenState::Stopping;
        true
    }

    pub fn fail(&mut self) {
        if self.is_active() {
            self.state = ListenState::Failed;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MicPermission {
    /// The user has not switched the microphone on yet.
    #[default]
    Unknown,
    Granted,
    Revoked,
}

/// What an error event means for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorOutcome {
    pub message: Option<&'static str>,
    /// No automatic recovery; the user has to switch the microphone on again.
    pub terminal: bool,
}

/// Microphone state that outlives individual sessions within a word.
#[derive(Clone, Debug)]
pub struct RestartPolicy {
    auto_restart: bool,
    manual_stop: bool,
    permission: MicPermission,
    consecutive_errors: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            auto_restart: true,
            manual_stop: false,
            permission: MicPermission::Unknown,
            consecutive_errors: 0,
        }
    }
}

impl RestartPolicy {
    pub fn permission(&self) -> MicPermission {
        self.permission
    }

    pub fn permission_granted(&self) -> bool {
        self.permission == MicPermission::Granted
    }

    pub fn manually_stopped(&self) -> bool {
        self.manual_stop
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// A fresh word: forget per-word stops and errors, keep the permission.
    pub fn new_turn(&mut self) {
        self.auto_restart = true;
        self.manual_stop = false;
        self.consecutive_errors = 0;
    }

    /// The user switched the microphone on.
    pub fn engage(&mut self) {
        self.new_turn();
        self.permission = MicPermission::Granted;
    }

    /// The user switched the microphone off for this word.
    pub fn stop_manually(&mut self) {
        self.manual_stop = true;
        self.auto_restart = false;
    }

    pub fn note_result(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Whether a platform-initiated end may be followed by an automatic restart.
    pub fn may_restart(&self) -> bool {
        !self.manual_stop
            && self.auto_restart
            && self.permission_granted()
            && self.consecutive_errors < RESTART_CEILING
    }

    pub fn on_error(&mut self, code: &RecognitionErrorCode) -> ErrorOutcome {
        match code {
            RecognitionErrorCode::NotAllowed | RecognitionErrorCode::ServiceNotAllowed => {
                self.auto_restart = false;
                self.manual_stop = true;
                self.permission = MicPermission::Revoked;
                ErrorOutcome {
                    message: Some("Microphone permission denied"),
                    terminal: true,
                }
            }
            RecognitionErrorCode::NoSpeech => {
                self.auto_restart = true;
                ErrorOutcome {
                    message: Some("No speech detected - please try again"),
                    terminal: false,
                }
            }
            RecognitionErrorCode::Aborted => {
                self.auto_restart = false;
                ErrorOutcome {
                    message: None,
                    terminal: false,
                }
            }
            RecognitionErrorCode::Network => ErrorOutcome {
                message: Some("Network error - check internet connection"),
                terminal: false,
            },
            RecognitionErrorCode::Other(_) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors > RESTART_CEILING - 1 {
                    self.auto_restart = false;
                    ErrorOutcome {
                        message: Some("Mic failed repeatedly - switch it back on manually"),
                        terminal: true,
                    }
                } else {
                    ErrorOutcome {
                        message: Some("Microphone error"),
                        terminal: false,
                    }
                }
            }
        }
    }
}
