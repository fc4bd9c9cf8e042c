use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use spellmaster::config::Config;
use spellmaster::engine::listening::MicPermission;
use spellmaster::engine::word_bank::{Difficulty, WordBank};
use spellmaster::engine::{Notice, NoticeLevel, Trainer};
use spellmaster::speech::command::CommandSynthesizer;
use spellmaster::speech::dictation::CommandRecognizer;
use spellmaster::speech::silent::{NoRecognizer, SilentSynthesizer};
use spellmaster::speech::{Recognizer, SpeechEvent, Synthesizer};
use spellmaster::store::JsonStore;

use crate::ui::components::menu::{Menu, MenuAction, MenuItem};
use crate::ui::components::stats_header::MicIndicator;
use crate::ui::theme::Theme;

const NOTICE_TTL: Duration = Duration::from_secs(4);

pub type SpeechTrainer = Trainer<Box<dyn Synthesizer>, Box<dyn Recognizer>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Menu,
    Practice,
}

pub struct App {
    pub screen: AppScreen,
    pub menu: Menu<'static>,
    pub theme: &'static Theme,
    pub config: Config,
    pub trainer: SpeechTrainer,
    pub store: Option<JsonStore>,
    pub notice: Option<(Notice, Instant)>,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config, theme: &'static Theme, speech_tx: Sender<SpeechEvent>) -> Result<Self> {
        let bank = match config.word_list {
            Some(ref path) => WordBank::load_from_path(path)?,
            None => WordBank::load_default(),
        };
        info!(words = bank.len(), "word list loaded");

        let mut startup_notices = Vec::new();
        let synth: Box<dyn Synthesizer> = match CommandSynthesizer::discover(
            config.tts_command.as_deref(),
            config.voice_settings(),
            speech_tx.clone(),
        ) {
            Ok(synth) => {
                info!(program = %synth.program().display(), "speech output ready");
                Box::new(synth)
            }
            Err(e) => {
                warn!("speech output disabled: {e}");
                startup_notices.push("No speech program found - words will not be spoken");
                Box::new(SilentSynthesizer::new(speech_tx.clone()))
            }
        };
        let recognizer: Box<dyn Recognizer> = match config.dictation_command {
            Some(ref command) => Box::new(CommandRecognizer::new(Some(command), speech_tx)),
            None => Box::new(NoRecognizer),
        };

        let store = match JsonStore::new() {
            Ok(store) => Some(store),
            Err(e) => {
                warn!("stats will not be saved: {e:#}");
                None
            }
        };
        let stats = store.as_ref().map(JsonStore::load_stats).unwrap_or_default();

        let trainer = Trainer::new(bank, config.trainer_settings(), stats, synth, recognizer);
        let mut app = Self::with_trainer(config, theme, trainer, store);

        let now = Instant::now();
        for message in startup_notices {
            app.set_notice(NoticeLevel::Warning, message, now);
        }
        Ok(app)
    }

    pub fn with_trainer(
        config: Config,
        theme: &'static Theme,
        mut trainer: SpeechTrainer,
        store: Option<JsonStore>,
    ) -> Self {
        trainer.set_difficulty(config.difficulty);
        let mut app = Self {
            screen: AppScreen::Menu,
            menu: Menu::new(theme, Vec::new()),
            theme,
            config,
            trainer,
            store,
            notice: None,
            should_quit: false,
        };
        app.refresh_menu();
        app.menu
            .select_action(MenuAction::Practice(app.config.difficulty));
        app
    }

    pub fn menu_items(&self) -> Vec<MenuItem> {
        let on_off = |on: bool| if on { "on" } else { "off" };
        let mut items: Vec<MenuItem> = Difficulty::ALL_CHOICES
            .iter()
            .map(|&difficulty| {
                let key = match difficulty {
                    Difficulty::All => 'a',
                    Difficulty::Tier(n) => char::from(b'0' + n),
                };
                MenuItem {
                    key,
                    label: difficulty.label(),
                    description: format!("{} words", self.trainer.pool_size(difficulty)),
                    action: MenuAction::Practice(difficulty),
                }
            })
            .collect();
        items.push(MenuItem {
            key: 'l',
            label: format!("Auto-listen: {}", on_off(self.config.auto_listen)),
            description: "start the mic after each word".to_string(),
            action: MenuAction::ToggleAutoListen,
        });
        items.push(MenuItem {
            key: 'n',
            label: format!("Auto-advance: {}", on_off(self.config.auto_advance)),
            description: "next word after a correct answer".to_string(),
            action: MenuAction::ToggleAutoAdvance,
        });
        items.push(MenuItem {
            key: 'r',
            label: "Reset stats".to_string(),
            description: format!(
                "{} correct of {}",
                self.trainer.stats().correct,
                self.trainer.stats().total
            ),
            action: MenuAction::ResetStats,
        });
        items
    }

    fn refresh_menu(&mut self) {
        let items = self.menu_items();
        self.menu.set_items(items);
    }

    pub fn activate(&mut self, action: MenuAction) {
        let now = Instant::now();
        match action {
            MenuAction::Practice(difficulty) => self.start_practice(difficulty, now),
            MenuAction::ToggleAutoListen => {
                self.set_auto_listen(!self.config.auto_listen, now);
                self.save_config();
            }
            MenuAction::ToggleAutoAdvance => {
                self.config.auto_advance = !self.config.auto_advance;
                self.trainer.set_auto_advance(self.config.auto_advance);
                self.save_config();
            }
            MenuAction::ResetStats => {
                self.trainer.reset_stats();
                self.persist_stats();
                self.set_notice(NoticeLevel::Info, "Stats reset", now);
            }
        }
        self.refresh_menu();
    }

    pub fn start_practice(&mut self, difficulty: Difficulty, now: Instant) {
        if self.config.difficulty != difficulty {
            self.config.difficulty = difficulty;
            self.save_config();
        }
        self.trainer.set_difficulty(difficulty);
        if self.trainer.start_new_turn() {
            self.screen = AppScreen::Practice;
        }
        self.drain_notices(now);
    }

    pub fn go_to_menu(&mut self) {
        self.trainer.halt();
        self.screen = AppScreen::Menu;
        self.refresh_menu();
    }

    pub fn set_auto_listen(&mut self, enabled: bool, now: Instant) {
        self.config.auto_listen = enabled;
        self.trainer.set_auto_listen(enabled);
        let message = if enabled {
            "Auto-listen on"
        } else {
            "Auto-listen off"
        };
        self.set_notice(NoticeLevel::Info, message, now);
    }

    pub fn tick(&mut self, now: Instant) {
        self.trainer.poll(now);
        self.after_update(now);
        if self
            .notice
            .as_ref()
            .is_some_and(|(_, shown)| now.duration_since(*shown) > NOTICE_TTL)
        {
            self.notice = None;
        }
    }

    /// Run after anything that may have touched the trainer.
    fn after_update(&mut self, now: Instant) {
        self.drain_notices(now);
        self.persist_stats();
    }

    pub fn mic_indicator(&self) -> MicIndicator {
        if !self.trainer.voice_supported() {
            MicIndicator::Unavailable
        } else if self.trainer.is_listening() {
            MicIndicator::Listening
        } else if self.trainer.mic_permission() == MicPermission::Revoked {
            MicIndicator::Blocked
        } else {
            MicIndicator::Off
        }
    }

    pub fn set_notice(&mut self, level: NoticeLevel, message: &str, now: Instant) {
        self.notice = Some((
            Notice {
                level,
                message: message.to_string(),
            },
            now,
        ));
    }

    fn drain_notices(&mut self, now: Instant) {
        if let Some(latest) = self.trainer.take_notices().pop() {
            self.notice = Some((latest, now));
        }
    }

    fn persist_stats(&mut self) {
        let Some(stats) = self.trainer.take_stats_update() else {
            return;
        };
        if let Some(ref store) = self.store
            && let Err(e) = store.save_stats(&stats)
        {
            warn!("failed to save stats: {e:#}");
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            warn!("failed to save config: {e:#}");
        }
    }
}
