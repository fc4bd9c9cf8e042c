use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::engine::grader;
use crate::engine::listening::{ListenState, ListeningSession, MicPermission, RestartPolicy};
use crate::engine::scheduler::{Scheduler, TaskId};
use crate::engine::selector::WordSelector;
use crate::engine::stats::Stats;
use crate::engine::transcript::{Dictation, LetterPolicy, TranscriptSegment};
use crate::engine::turn::{Turn, TurnStatus};
use crate::engine::word_bank::{Difficulty, WordBank};
use crate::speech::{
    RecognitionErrorCode, Recognizer, SessionId, SpeechEvent, Synthesizer, UtteranceId,
};

/// Behaviour switches and timings for a practice session.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainerSettings {
    pub auto_listen: bool,
    pub auto_advance: bool,
    pub letter_policy: LetterPolicy,
    /// Quiet time after the last dictation result before the answer is taken.
    pub silence_timeout: Duration,
    /// Wait between stopping the recognizer and grading, for trailing results.
    pub submit_grace: Duration,
    /// Delay before listening again after a wrong answer.
    pub retry_listen_delay: Duration,
    /// Delay before restarting a recognizer that ended on its own.
    pub restart_backoff: Duration,
    pub auto_advance_delay: Duration,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            auto_listen: true,
            auto_advance: true,
            letter_policy: LetterPolicy::Strict,
            silence_timeout: Duration::from_millis(3000),
            submit_grace: Duration::from_millis(100),
            retry_listen_delay: Duration::from_millis(600),
            restart_backoff: Duration::from_millis(500),
            auto_advance_delay: Duration::from_millis(2500),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A short message for the status line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    SilenceExpired,
    SubmitDictation,
    SubmitInput,
    RestartListening,
    RetryListening,
    AutoAdvance,
}

impl Task {
    fn starts_listening(&self) -> bool {
        matches!(self, Task::RestartListening | Task::RetryListening)
    }

    fn submits(&self) -> bool {
        matches!(self, Task::SubmitDictation | Task::SubmitInput)
    }
}

/// What to do once the utterance being waited on finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterSpeech {
    /// Listen for a fresh answer.
    Listen,
    /// Listen again: the microphone was on when the word was repeated.
    Resume,
}

/// Drives one word at a time: speaks it, listens for the spelled answer,
/// grades it and moves on.
///
/// Everything runs on the caller's thread. Speech backends report back through
/// [`Trainer::handle_speech`], and timers fire from [`Trainer::poll`]. Every
/// timer is stamped with the turn epoch it was scheduled in and is dropped if a
/// new word started since.
pub struct Trainer<S, R> {
    settings: TrainerSettings,
    bank: WordBank,
    selector: WordSelector,
    difficulty: Difficulty,

    synth: S,
    recognizer: R,
    voice_supported: bool,

    turn: Option<Turn>,
    epoch: u64,
    input: String,
    dictation: Dictation,

    session: Option<ListeningSession>,
    restart: RestartPolicy,
    scheduler: Scheduler<Task>,
    silence_task: Option<TaskId>,
    after_speech: Option<(UtteranceId, AfterSpeech)>,
    next_utterance: u64,
    next_session: u64,

    stats: Stats,
    stats_dirty: bool,
    notices: VecDeque<Notice>,
}

impl<S: Synthesizer, R: Recognizer> Trainer<S, R> {
    pub fn new(
        bank: WordBank,
        settings: TrainerSettings,
        stats: Stats,
        synth: S,
        recognizer: R,
    ) -> Self {
        let voice_supported = recognizer.is_supported();
        Self {
            settings,
            bank,
            selector: WordSelector::from_entropy(),
            difficulty: Difficulty::All,
            synth,
            recognizer,
            voice_supported,
            turn: None,
            epoch: 0,
            input: String::new(),
            dictation: Dictation::default(),
            session: None,
            restart: RestartPolicy::default(),
            scheduler: Scheduler::new(),
            silence_task: None,
            after_speech: None,
            next_utterance: 0,
            next_session: 0,
            stats,
            stats_dirty: false,
            notices: VecDeque::new(),
        }
    }

    /// Deterministic word order, for tests and benchmarks.
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.selector = WordSelector::new(rng);
        self
    }

    // --- Accessors ---

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Number of words practiced at `difficulty`.
    pub fn pool_size(&self, difficulty: Difficulty) -> usize {
        self.bank.slice(difficulty).len()
    }

    pub fn turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    pub fn status(&self) -> Option<TurnStatus> {
        self.turn.as_ref().map(|t| t.status)
    }

    /// True while the current word still takes answers.
    pub fn turn_open(&self) -> bool {
        self.turn.as_ref().is_some_and(|t| !t.status.is_terminal())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn voice_supported(&self) -> bool {
        self.voice_supported
    }

    pub fn mic_permission(&self) -> MicPermission {
        self.restart.permission()
    }

    pub fn listen_state(&self) -> Option<ListenState> {
        self.session.as_ref().map(ListeningSession::state)
    }

    pub fn is_listening(&self) -> bool {
        self.session.as_ref().is_some_and(ListeningSession::is_active)
    }

    pub fn hint(&self) -> Option<String> {
        self.turn.as_ref().filter(|t| t.hint_shown).map(Turn::hint)
    }

    pub fn synthesizer(&self) -> &S {
        &self.synth
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn auto_advance_pending(&self) -> bool {
        self.scheduler.contains(|t| *t == Task::AutoAdvance)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Time left before the current dictation is taken as the answer.
    pub fn silence_remaining(&self, now: Instant) -> Option<Duration> {
        let due = self.scheduler.deadline(self.silence_task?)?;
        Some(due.saturating_duration_since(now))
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Stats changed since the last call; hand them to the store.
    pub fn take_stats_update(&mut self) -> Option<Stats> {
        std::mem::take(&mut self.stats_dirty).then_some(self.stats)
    }

    // --- Settings ---

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.difficulty != difficulty {
            info!(%difficulty, "difficulty changed");
        }
        self.difficulty = difficulty;
    }

    pub fn set_auto_listen(&mut self, enabled: bool) {
        self.settings.auto_listen = enabled;
        if !enabled {
            self.scheduler.cancel_where(Task::starts_listening);
        }
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.settings.auto_advance = enabled;
        if !enabled {
            self.scheduler.cancel_where(|t| *t == Task::AutoAdvance);
        }
    }

    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
        self.stats_dirty = true;
    }

    // --- Turn lifecycle ---

    /// Pick the next word, speak it and get ready for an answer. Returns false
    /// when the current difficulty has no words.
    pub fn start_new_turn(&mut self) -> bool {
        let Some(word) = self.selector.next(&self.bank, self.difficulty) else {
            warn!(difficulty = %self.difficulty, "no words to practice");
            self.notify(NoticeLevel::Warning, "No words available at this level");
            return false;
        };

        self.epoch += 1;
        self.scheduler.cancel_all();
        self.silence_task = None;
        self.stop_listening();
        self.restart.new_turn();
        self.dictation.clear();
        self.input.clear();

        info!(epoch = self.epoch, %word, "new word");
        let utterance = self.speak(&word);
        self.turn = Some(Turn::new(word));
        self.after_speech = Some((utterance, AfterSpeech::Listen));
        true
    }

    /// Same as starting a new turn; counts nothing.
    pub fn skip(&mut self) -> bool {
        debug!(epoch = self.epoch, "skipping word");
        self.start_new_turn()
    }

    /// Leave practice: silence everything and forget the current word.
    pub fn halt(&mut self) {
        self.epoch += 1;
        self.scheduler.cancel_all();
        self.silence_task = None;
        self.stop_listening();
        self.after_speech = None;
        self.synth.cancel();
        self.turn = None;
        self.dictation.clear();
        self.input.clear();
    }

    /// Grade `answer`, or the current input when `None`. Returns whether the
    /// answer was right, or `None` when nothing was graded.
    pub fn submit(&mut self, answer: Option<String>, now: Instant) -> Option<bool> {
        if !self.turn_open() {
            return None;
        }
        self.stop_listening();
        self.scheduler
            .cancel_where(|t| t.starts_listening() || t.submits());

        let answer = answer.unwrap_or_else(|| self.input.clone());
        let turn = self.turn.as_mut()?;
        let correct = grader::is_match(&answer, &turn.word);
        turn.submitted = Some(answer);

        if correct {
            turn.status = TurnStatus::Correct;
            let word = turn.word.clone();
            self.stats.record_correct();
            self.stats_dirty = true;
            info!(%word, streak = self.stats.streak, "correct");
            self.speak(&format!("Correct! {word}"));
            if self.settings.auto_advance {
                self.scheduler.schedule(
                    now + self.settings.auto_advance_delay,
                    self.epoch,
                    Task::AutoAdvance,
                );
            }
        } else {
            turn.status = TurnStatus::Incorrect;
            turn.wrong_attempts += 1;
            let attempts = turn.wrong_attempts;
            self.stats.record_incorrect();
            self.stats_dirty = true;
            info!(attempts, "incorrect");
            self.speak("Let's try again.");
            self.dictation.clear();
            self.input.clear();
            if self.settings.auto_listen && !self.restart.manually_stopped() {
                self.scheduler.schedule(
                    now + self.settings.retry_listen_delay,
                    self.epoch,
                    Task::RetryListening,
                );
            }
        }
        Some(correct)
    }

    /// The user asked to check. While listening, the recognizer gets a short
    /// grace period to deliver trailing results first.
    pub fn check(&mut self, now: Instant) {
        if !self.turn_open() {
            return;
        }
        if self.is_listening() {
            self.stop_listening();
            self.scheduler
                .schedule(now + self.settings.submit_grace, self.epoch, Task::SubmitInput);
        } else {
            self.submit(None, now);
        }
    }

    pub fn reveal(&mut self) -> bool {
        if !self.turn_open() {
            return false;
        }
        self.stop_listening();
        self.scheduler
            .cancel_where(|t| t.starts_listening() || t.submits());

        let Some(turn) = self.turn.as_mut() else {
            return false;
        };
        turn.status = TurnStatus::Revealed;
        let word = turn.word.clone();
        self.stats.break_streak();
        self.stats_dirty = true;
        info!(%word, "revealed");
        self.speak(&format!("The word is {word}"));
        true
    }

    /// Say the word again. If the microphone was on (or about to come back on)
    /// it resumes after the word has been spoken.
    pub fn repeat(&mut self) {
        let Some(word) = self.turn.as_ref().map(|t| t.word.clone()) else {
            return;
        };
        let pending_listen = self.scheduler.contains(Task::starts_listening);
        let resume = self.is_listening() || pending_listen;
        self.scheduler.cancel_where(Task::starts_listening);
        self.stop_listening();

        let utterance = self.speak(&word);
        if resume && self.turn_open() {
            self.after_speech = Some((utterance, AfterSpeech::Resume));
        }
    }

    pub fn show_hint(&mut self) -> bool {
        match self.turn.as_mut() {
            Some(turn) if turn.hint_available() => {
                turn.hint_shown = true;
                true
            }
            _ => false,
        }
    }

    // --- Typed input ---

    pub fn push_char(&mut self, c: char) {
        if self.turn_open() {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.turn_open() {
            self.input.pop();
        }
    }

    pub fn set_input(&mut self, text: &str) {
        if self.turn_open() {
            self.input = text.to_string();
        }
    }

    // --- Microphone ---

    /// The microphone button: off when listening, otherwise on.
    pub fn toggle_mic(&mut self) {
        if !self.voice_supported {
            self.notify(NoticeLevel::Info, "Speech input is not available");
            return;
        }
        if self.is_listening() {
            self.stop_listening_by_user();
            return;
        }
        if !self.turn_open() {
            return;
        }
        self.restart.engage();
        self.scheduler.cancel_where(Task::starts_listening);
        self.after_speech = None;
        self.start_listening();
    }

    /// Switch the microphone off for the rest of this word. Returns false when
    /// there was nothing to stop.
    pub fn stop_listening_by_user(&mut self) -> bool {
        let pending = self.scheduler.contains(Task::starts_listening)
            || self
                .after_speech
                .is_some_and(|(_, after)| after == AfterSpeech::Resume);
        if !self.is_listening() && !pending {
            return false;
        }
        info!("microphone switched off");
        self.restart.stop_manually();
        self.scheduler.cancel_where(Task::starts_listening);
        self.after_speech = None;
        self.stop_listening();
        true
    }

    // --- Events and timers ---

    pub fn handle_speech(&mut self, event: SpeechEvent, now: Instant) {
        match event {
            SpeechEvent::UtteranceEnded(id) => self.on_utterance_ended(id),
            SpeechEvent::RecognitionStarted(id) => {
                if let Some(session) = self.session.as_mut().filter(|s| s.id() == id) {
                    session.mark_started();
                }
            }
            SpeechEvent::RecognitionResult { session, segments } => {
                self.on_result(session, &segments, now)
            }
            SpeechEvent::RecognitionEnded(id) => self.on_recognition_ended(id, now),
            SpeechEvent::RecognitionError { session, code } => {
                self.on_recognition_error(session, &code)
            }
        }
    }

    /// Run every timer that is due, one at a time, so a task can still cancel
    /// the ones behind it.
    pub fn poll(&mut self, now: Instant) {
        while let Some((epoch, task)) = self.scheduler.pop_due(now) {
            if epoch != self.epoch {
                debug!(?task, epoch, "dropping timer from an earlier word");
                continue;
            }
            self.run_task(task, now);
        }
    }

    fn run_task(&mut self, task: Task, now: Instant) {
        debug!(?task, "timer fired");
        match task {
            Task::SilenceExpired => {
                self.silence_task = None;
                info!("silence, taking the dictated answer");
                self.stop_listening();
                self.scheduler.cancel_where(Task::starts_listening);
                self.scheduler
                    .schedule(now + self.settings.submit_grace, self.epoch, Task::SubmitDictation);
            }
            Task::SubmitDictation => {
                let letters = self.dictation.letters().trim().to_string();
                if letters.is_empty() {
                    debug!("no letters dictated, nothing to grade");
                    return;
                }
                self.submit(Some(letters), now);
            }
            Task::SubmitInput => {
                self.submit(None, now);
            }
            Task::RestartListening => {
                if self.session.is_some()
                    || !self.turn_open()
                    || !self.settings.auto_listen
                    || !self.restart.may_restart()
                {
                    return;
                }
                debug!("restarting speech input");
                self.start_listening();
            }
            Task::RetryListening => {
                if !self.turn_open()
                    || !self.settings.auto_listen
                    || self.restart.manually_stopped()
                {
                    return;
                }
                self.start_listening();
            }
            Task::AutoAdvance => {
                if self.status() == Some(TurnStatus::Correct) {
                    self.start_new_turn();
                }
            }
        }
    }

    fn on_utterance_ended(&mut self, id: UtteranceId) {
        let Some((awaited, _)) = self.after_speech else {
            return;
        };
        if awaited != id {
            debug!(?id, "ignoring end of a superseded utterance");
            return;
        }
        self.after_speech = None;

        if self.turn_open()
            && self.settings.auto_listen
            && self.restart.permission_granted()
            && !self.restart.manually_stopped()
        {
            self.start_listening();
        }
    }

    fn on_result(&mut self, id: SessionId, segments: &[TranscriptSegment], now: Instant) {
        let grace_open = self.scheduler.contains(Task::submits);
        let Some(session) = self.session.as_mut().filter(|s| s.id() == id) else {
            debug!(session = %id, "ignoring result from an old session");
            return;
        };
        if !session.accepts_results() {
            return;
        }
        if session.state() == ListenState::Stopping && !grace_open {
            return;
        }

        if session.is_active() {
            session.mark_started();
            let task = self.scheduler.schedule(
                now + self.settings.silence_timeout,
                self.epoch,
                Task::SilenceExpired,
            );
            if let Some(old) = self.silence_task.replace(task) {
                self.scheduler.cancel(old);
            }
        }
        self.restart.note_result();

        if let Some(display) = self.dictation.apply(segments, self.settings.letter_policy) {
            self.input = display;
        }
    }

    fn on_recognition_ended(&mut self, id: SessionId, now: Instant) {
        let Some(session) = self.session.take_if(|s| s.id() == id) else {
            return;
        };
        debug!(session = %id, state = ?session.state(), "speech input ended");
        if session.state() == ListenState::Stopping {
            return;
        }
        if self.turn_open() && self.settings.auto_listen && self.restart.may_restart() {
            self.scheduler.schedule(
                now + self.settings.restart_backoff,
                self.epoch,
                Task::RestartListening,
            );
        }
    }

    fn on_recognition_error(&mut self, id: SessionId, code: &RecognitionErrorCode) {
        let Some(session) = self.session.as_mut().filter(|s| s.id() == id) else {
            return;
        };
        session.fail();
        // The session is finished either way; make sure the backend lets go.
        self.recognizer.stop();

        let outcome = self.restart.on_error(code);
        warn!(%code, errors = self.restart.consecutive_errors(), "speech input error");
        if outcome.terminal {
            self.scheduler.cancel_where(Task::starts_listening);
        }
        if let Some(message) = outcome.message {
            let level = if outcome.terminal {
                NoticeLevel::Error
            } else {
                NoticeLevel::Warning
            };
            self.notify(level, message);
        }
    }

    // --- Internals ---

    fn speak(&mut self, text: &str) -> UtteranceId {
        self.next_utterance += 1;
        let id = UtteranceId(self.next_utterance);
        self.after_speech = None;
        self.synth.speak(text, id);
        id
    }

    /// Open a fresh session. Every session starts from an empty answer.
    fn start_listening(&mut self) {
        if !self.voice_supported {
            return;
        }
        self.stop_listening();
        self.dictation.clear();
        self.input.clear();

        self.next_session += 1;
        let id = SessionId(self.next_session);
        match self.recognizer.start(id) {
            Ok(()) => {
                debug!(session = %id, "listening");
                self.session = Some(ListeningSession::new(id));
            }
            Err(e) => {
                warn!("could not start speech input: {e}");
                self.session = None;
                self.notify(NoticeLevel::Error, "Could not start the microphone");
            }
        }
    }

    /// Stop the current session if there is one. Safe to call repeatedly.
    fn stop_listening(&mut self) -> bool {
        if let Some(task) = self.silence_task.take() {
            self.scheduler.cancel(task);
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.begin_stop() {
            return false;
        }
        debug!(session = %session.id(), "stopping speech input");
        self.recognizer.stop();
        true
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push_back(Notice {
            level,
            message: message.to_string(),
        });
    }
}
