use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::SmallRng;

use spellmaster::engine::listening::ListenState;
use spellmaster::engine::stats::Stats;
use spellmaster::engine::transcript::TranscriptSegment;
use spellmaster::engine::turn::TurnStatus;
use spellmaster::engine::word_bank::WordBank;
use spellmaster::engine::{NoticeLevel, Trainer, TrainerSettings};
use spellmaster::speech::{
    RecognitionErrorCode, Recognizer, SessionId, SpeechError, SpeechEvent, Synthesizer,
    UtteranceId,
};

#[derive(Default)]
struct FakeSynth {
    spoken: Vec<(String, UtteranceId)>,
}

impl Synthesizer for FakeSynth {
    fn speak(&mut self, text: &str, id: UtteranceId) {
        self.spoken.push((text.to_string(), id));
    }

    fn cancel(&mut self) {}
}

#[derive(Default)]
struct FakeRecognizer {
    starts: Vec<SessionId>,
    stops: usize,
}

impl Recognizer for FakeRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self, session: SessionId) -> Result<(), SpeechError> {
        self.starts.push(session);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

type TestTrainer = Trainer<FakeSynth, FakeRecognizer>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn trainer_with(words: &[&str], settings: TrainerSettings) -> TestTrainer {
    Trainer::new(
        WordBank::from_words(words.iter().copied()),
        settings,
        Stats::default(),
        FakeSynth::default(),
        FakeRecognizer::default(),
    )
    .with_rng(SmallRng::seed_from_u64(11))
}

fn trainer(words: &[&str]) -> TestTrainer {
    trainer_with(words, TrainerSettings::default())
}

fn last_spoken(t: &TestTrainer) -> (String, UtteranceId) {
    t.synthesizer().spoken.last().cloned().expect("nothing spoken")
}

fn current_session(t: &TestTrainer) -> SessionId {
    *t.recognizer().starts.last().expect("never listened")
}

fn finish_speaking(t: &mut TestTrainer, now: Instant) {
    let (_, id) = last_spoken(t);
    t.handle_speech(SpeechEvent::UtteranceEnded(id), now);
}

fn say(t: &mut TestTrainer, session: SessionId, text: &str, now: Instant) {
    t.handle_speech(
        SpeechEvent::RecognitionResult {
            session,
            segments: vec![TranscriptSegment::final_(text)],
        },
        now,
    );
}

/// A trainer on its first word with the microphone switched on and listening.
fn listening_trainer(words: &[&str], now: Instant) -> (TestTrainer, SessionId) {
    let mut t = trainer(words);
    assert!(t.start_new_turn());
    finish_speaking(&mut t, now);
    t.toggle_mic();
    let session = current_session(&t);
    t.handle_speech(SpeechEvent::RecognitionStarted(session), now);
    assert!(t.is_listening());
    (t, session)
}

#[test]
fn spelled_letters_are_graded_after_silence() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["spell"], t0);

    for (i, letter) in ["s", "p", "e", "l", "l"].iter().enumerate() {
        say(&mut t, session, letter, t0 + ms(100 * i as u64));
    }
    assert_eq!(t.input(), "spell");
    let last_result = t0 + ms(400);

    t.poll(last_result + ms(2999));
    assert!(t.is_listening());

    t.poll(last_result + ms(3000));
    assert_eq!(t.listen_state(), Some(ListenState::Stopping));
    assert_eq!(t.status(), Some(TurnStatus::Idle));

    t.poll(last_result + ms(3100));
    assert_eq!(t.status(), Some(TurnStatus::Correct));
    assert_eq!(t.stats().correct, 1);
    assert_eq!(last_spoken(&t).0, "Correct! spell");
}

#[test]
fn silence_with_nothing_spelled_grades_nothing() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);

    // Only a long word: resets the timer but commits nothing.
    say(&mut t, session, "hello", t0);
    assert_eq!(t.input(), "");

    t.poll(t0 + ms(5000));
    assert_eq!(t.status(), Some(TurnStatus::Idle));
    assert_eq!(t.stats().total, 0);
}

#[test]
fn results_push_the_silence_deadline_back() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);

    say(&mut t, session, "c", t0);
    assert_eq!(t.silence_remaining(t0 + ms(1000)), Some(ms(2000)));
    say(&mut t, session, "a", t0 + ms(2500));
    t.poll(t0 + ms(3500));
    assert!(t.is_listening());
    assert_eq!(t.silence_remaining(t0 + ms(3500)), Some(ms(2000)));
}

#[test]
fn interim_letters_preview_without_committing() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);

    say(&mut t, session, "c", t0);
    t.handle_speech(
        SpeechEvent::RecognitionResult {
            session,
            segments: vec![TranscriptSegment::interim("a")],
        },
        t0,
    );
    assert_eq!(t.input(), "ca");

    t.handle_speech(
        SpeechEvent::RecognitionResult {
            session,
            segments: vec![TranscriptSegment::interim("hello there")],
        },
        t0,
    );
    assert_eq!(t.input(), "ca");

    say(&mut t, session, "a t", t0);
    assert_eq!(t.input(), "cat");
}

#[test]
fn auto_advance_fires_exactly_once_after_the_delay() {
    let t0 = Instant::now();
    let mut t = trainer(&["cat", "dog", "sun"]);
    t.start_new_turn();
    let word = t.turn().unwrap().word.clone();

    assert_eq!(t.submit(Some(word.to_uppercase()), t0), Some(true));
    let epoch = t.epoch();

    t.poll(t0 + ms(2499));
    assert_eq!(t.epoch(), epoch);
    assert_eq!(t.status(), Some(TurnStatus::Correct));

    t.poll(t0 + ms(2500));
    assert_eq!(t.epoch(), epoch + 1);
    assert_eq!(t.status(), Some(TurnStatus::Idle));

    t.poll(t0 + ms(10_000));
    assert_eq!(t.epoch(), epoch + 1);
}

#[test]
fn skipping_cancels_a_pending_auto_advance() {
    let t0 = Instant::now();
    let mut t = trainer(&["cat", "dog"]);
    t.start_new_turn();
    let word = t.turn().unwrap().word.clone();
    t.submit(Some(word), t0);

    t.skip();
    let epoch = t.epoch();
    t.poll(t0 + ms(3000));
    assert_eq!(t.epoch(), epoch);
}

#[test]
fn no_auto_advance_leaves_the_word_up() {
    let t0 = Instant::now();
    let settings = TrainerSettings {
        auto_advance: false,
        ..TrainerSettings::default()
    };
    let mut t = trainer_with(&["cat"], settings);
    t.start_new_turn();
    t.submit(Some("cat".into()), t0);
    t.poll(t0 + ms(60_000));
    assert_eq!(t.status(), Some(TurnStatus::Correct));
    assert_eq!(t.epoch(), 1);
}

#[test]
fn wrong_answer_listens_again_after_the_retry_delay() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    say(&mut t, session, "k", t0);

    t.check(t0);
    assert!(!t.is_listening());
    t.poll(t0 + ms(100));
    assert_eq!(t.status(), Some(TurnStatus::Incorrect));
    assert_eq!(t.input(), "");
    assert_eq!(t.turn().unwrap().submitted.as_deref(), Some("k"));

    let starts = t.recognizer().starts.len();
    t.poll(t0 + ms(699));
    assert_eq!(t.recognizer().starts.len(), starts);
    t.poll(t0 + ms(700));
    assert_eq!(t.recognizer().starts.len(), starts + 1);
    assert!(t.is_listening());
}

#[test]
fn manual_check_waits_for_trailing_results() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    say(&mut t, session, "c a", t0);

    t.check(t0);
    // A final that was already in flight when the user pressed Enter.
    say(&mut t, session, "t", t0 + ms(50));
    assert_eq!(t.status(), Some(TurnStatus::Idle));

    t.poll(t0 + ms(100));
    assert_eq!(t.status(), Some(TurnStatus::Correct));
    assert_eq!(t.stats().total, 1);
}

#[test]
fn stopping_twice_is_a_no_op() {
    let t0 = Instant::now();
    let (mut t, _) = listening_trainer(&["cat"], t0);
    t.take_notices();

    assert!(t.stop_listening_by_user());
    let stops = t.recognizer().stops;
    assert!(!t.stop_listening_by_user());
    assert_eq!(t.recognizer().stops, stops);
    assert!(t.take_notices().is_empty());
}

#[test]
fn recognizer_ending_on_its_own_restarts_with_an_empty_answer() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    say(&mut t, session, "c a", t0);
    assert_eq!(t.input(), "ca");

    t.handle_speech(SpeechEvent::RecognitionEnded(session), t0 + ms(100));
    assert!(!t.is_listening());
    t.poll(t0 + ms(599));
    assert_eq!(t.recognizer().starts.len(), 1);
    t.poll(t0 + ms(600));
    assert_eq!(t.recognizer().starts.len(), 2);
    assert_eq!(t.input(), "");

    let next = current_session(&t);
    say(&mut t, next, "t", t0 + ms(700));
    assert_eq!(t.input(), "t");

    t.poll(t0 + ms(3700));
    t.poll(t0 + ms(3800));
    assert_eq!(t.status(), Some(TurnStatus::Incorrect));
    assert_eq!(t.turn().and_then(|turn| turn.submitted.clone()).as_deref(), Some("t"));
}

#[test]
fn silence_cancels_a_restart_due_in_the_same_poll() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    say(&mut t, session, "c", t0);

    // Platform ends the session shortly before the silence deadline, so the
    // restart comes due right behind it.
    t.handle_speech(SpeechEvent::RecognitionEnded(session), t0 + ms(2600));
    t.poll(t0 + ms(3200));
    assert_eq!(t.recognizer().starts.len(), 1);
    assert!(!t.is_listening());

    t.poll(t0 + ms(3300));
    assert_eq!(t.status(), Some(TurnStatus::Incorrect));
    assert_eq!(t.recognizer().starts.len(), 1);
}

#[test]
fn ending_a_stopped_session_never_restarts() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    t.stop_listening_by_user();
    t.handle_speech(SpeechEvent::RecognitionEnded(session), t0);
    t.poll(t0 + ms(5000));
    assert_eq!(t.recognizer().starts.len(), 1);
    assert_eq!(t.listen_state(), None);
}

#[test]
fn stale_events_are_ignored() {
    let t0 = Instant::now();
    let (mut t, old_session) = listening_trainer(&["cat", "dog"], t0);
    let (_, old_utterance) = t.synthesizer().spoken[0].clone();

    t.skip();
    finish_speaking(&mut t, t0);
    let new_session = current_session(&t);
    assert_ne!(new_session, old_session);

    say(&mut t, old_session, "x", t0);
    assert_eq!(t.input(), "");
    t.handle_speech(SpeechEvent::RecognitionEnded(old_session), t0);
    assert!(t.is_listening());

    // The end of the first word's utterance must not start another session.
    let starts = t.recognizer().starts.len();
    t.handle_speech(SpeechEvent::UtteranceEnded(old_utterance), t0);
    assert_eq!(t.recognizer().starts.len(), starts);
}

#[test]
fn mic_starts_after_speech_once_permission_was_granted() {
    let t0 = Instant::now();
    let (mut t, _) = listening_trainer(&["cat", "dog"], t0);

    t.skip();
    assert!(!t.is_listening());
    let starts = t.recognizer().starts.len();
    finish_speaking(&mut t, t0);
    assert_eq!(t.recognizer().starts.len(), starts + 1);
}

#[test]
fn permission_denied_is_reported_and_stops_restarts() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    t.take_notices();

    t.handle_speech(
        SpeechEvent::RecognitionError {
            session,
            code: RecognitionErrorCode::NotAllowed,
        },
        t0,
    );
    let notices = t.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Microphone permission denied");

    t.handle_speech(SpeechEvent::RecognitionEnded(session), t0);
    t.poll(t0 + ms(5000));
    assert_eq!(t.recognizer().starts.len(), 1);
}

#[test]
fn no_speech_error_restarts_after_backoff() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    t.handle_speech(
        SpeechEvent::RecognitionError {
            session,
            code: RecognitionErrorCode::NoSpeech,
        },
        t0,
    );
    assert_eq!(t.listen_state(), Some(ListenState::Failed));
    t.handle_speech(SpeechEvent::RecognitionEnded(session), t0);
    t.poll(t0 + ms(500));
    assert_eq!(t.recognizer().starts.len(), 2);
}

#[test]
fn reveal_cancels_a_pending_retry() {
    let t0 = Instant::now();
    let (mut t, _) = listening_trainer(&["cat"], t0);
    t.submit(Some("kat".into()), t0);
    assert!(t.reveal());
    t.poll(t0 + ms(5000));
    assert_eq!(t.recognizer().starts.len(), 1);
    assert_eq!(t.stats().streak, 0);
    assert_eq!(t.status(), Some(TurnStatus::Revealed));
}

#[test]
fn repeat_resumes_listening_after_the_word() {
    let t0 = Instant::now();
    let (mut t, session) = listening_trainer(&["cat"], t0);
    say(&mut t, session, "c", t0);

    t.repeat();
    assert!(!t.is_listening());
    assert_eq!(last_spoken(&t).0, "cat");

    finish_speaking(&mut t, t0 + ms(800));
    assert!(t.is_listening());
    assert_eq!(t.recognizer().starts.len(), 2);
    assert_eq!(t.input(), "");
}

#[test]
fn repeat_does_not_resume_with_auto_listen_off() {
    let t0 = Instant::now();
    let (mut t, _) = listening_trainer(&["cat"], t0);
    t.set_auto_listen(false);

    t.repeat();
    finish_speaking(&mut t, t0 + ms(800));
    assert!(!t.is_listening());
    assert_eq!(t.recognizer().starts.len(), 1);
}

#[test]
fn voice_unavailable_still_allows_typing() {
    struct Deaf;
    impl Recognizer for Deaf {
        fn is_supported(&self) -> bool {
            false
        }
        fn start(&mut self, _: SessionId) -> Result<(), SpeechError> {
            Err(SpeechError::Unavailable)
        }
        fn stop(&mut self) {}
    }

    let t0 = Instant::now();
    let mut t = Trainer::new(
        WordBank::from_words(["cat"]),
        TrainerSettings::default(),
        Stats::default(),
        FakeSynth::default(),
        Deaf,
    );
    t.start_new_turn();
    t.toggle_mic();
    assert!(!t.is_listening());
    assert_eq!(t.take_notices().len(), 1);

    t.set_input("cat");
    t.check(t0);
    assert_eq!(t.status(), Some(TurnStatus::Correct));
}
