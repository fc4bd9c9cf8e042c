use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::trainer::TrainerSettings;
use crate::engine::transcript::LetterPolicy;
use crate::engine::word_bank::Difficulty;
use crate::speech::VoiceSettings;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default = "default_true")]
    pub auto_listen: bool,
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    #[serde(default)]
    pub letter_policy: LetterPolicy,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_speech_pitch")]
    pub speech_pitch: f32,
    /// Text-to-speech program; probed on `PATH` when unset.
    #[serde(default)]
    pub tts_command: Option<String>,
    /// Dictation program and arguments. Speech input is off when unset.
    #[serde(default)]
    pub dictation_command: Option<String>,
    /// Replaces the built-in word list.
    #[serde(default)]
    pub word_list: Option<PathBuf>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,
    #[serde(default = "default_submit_grace_ms")]
    pub submit_grace_ms: u64,
    #[serde(default = "default_retry_listen_ms")]
    pub retry_listen_ms: u64,
    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_ms: u64,
}

fn default_difficulty() -> Difficulty {
    Difficulty::All
}
fn default_true() -> bool {
    true
}
fn default_speech_rate() -> f32 {
    0.9
}
fn default_speech_pitch() -> f32 {
    1.0
}
fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_silence_timeout_ms() -> u64 {
    3000
}
fn default_submit_grace_ms() -> u64 {
    100
}
fn default_retry_listen_ms() -> u64 {
    600
}
fn default_restart_backoff_ms() -> u64 {
    500
}
fn default_auto_advance_ms() -> u64 {
    2500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            auto_listen: default_true(),
            auto_advance: default_true(),
            letter_policy: LetterPolicy::default(),
            voice: None,
            speech_rate: default_speech_rate(),
            speech_pitch: default_speech_pitch(),
            tts_command: None,
            dictation_command: None,
            word_list: None,
            theme: default_theme(),
            log_level: default_log_level(),
            silence_timeout_ms: default_silence_timeout_ms(),
            submit_grace_ms: default_submit_grace_ms(),
            retry_listen_ms: default_retry_listen_ms(),
            restart_backoff_ms: default_restart_backoff_ms(),
            auto_advance_ms: default_auto_advance_ms(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spellmaster")
            .join("config.toml")
    }

    /// Pull hand-edited values back into a usable range.
    pub fn validate(&mut self) {
        if !self.speech_rate.is_finite() {
            self.speech_rate = default_speech_rate();
        }
        if !self.speech_pitch.is_finite() {
            self.speech_pitch = default_speech_pitch();
        }
        self.speech_rate = self.speech_rate.clamp(0.1, 4.0);
        self.speech_pitch = self.speech_pitch.clamp(0.0, 2.0);
        self.silence_timeout_ms = self.silence_timeout_ms.clamp(500, 30_000);
        self.submit_grace_ms = self.submit_grace_ms.min(2000);
        self.retry_listen_ms = self.retry_listen_ms.min(10_000);
        self.restart_backoff_ms = self.restart_backoff_ms.clamp(50, 10_000);
        self.auto_advance_ms = self.auto_advance_ms.clamp(250, 30_000);
        for command in [&mut self.tts_command, &mut self.dictation_command] {
            if command.as_deref().is_some_and(|c| c.trim().is_empty()) {
                *command = None;
            }
        }
        if self.theme.trim().is_empty() {
            self.theme = default_theme();
        }
    }

    pub fn trainer_settings(&self) -> TrainerSettings {
        TrainerSettings {
            auto_listen: self.auto_listen,
            auto_advance: self.auto_advance,
            letter_policy: self.letter_policy,
            silence_timeout: Duration::from_millis(self.silence_timeout_ms),
            submit_grace: Duration::from_millis(self.submit_grace_ms),
            retry_listen_delay: Duration::from_millis(self.retry_listen_ms),
            restart_backoff: Duration::from_millis(self.restart_backoff_ms),
            auto_advance_delay: Duration::from_millis(self.auto_advance_ms),
        }
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            voice: self.voice.clone(),
            rate: self.speech_rate,
            pitch: self.speech_pitch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.trainer_settings(), TrainerSettings::default());
        assert_eq!(config.voice_settings(), VoiceSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let toml_str = r#"
difficulty = "3"
letter_policy = "permissive"
dictation_command = "vosk-letters --model small"
auto_advance = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.difficulty, Difficulty::Tier(3));
        assert_eq!(config.letter_policy, LetterPolicy::Permissive);
        assert_eq!(
            config.dictation_command.as_deref(),
            Some("vosk-letters --model small")
        );
        assert!(!config.auto_advance);
        assert!(config.auto_listen);
        assert_eq!(config.silence_timeout_ms, 3000);
    }

    #[test]
    fn serde_roundtrip() {
        let mut config = Config::default();
        config.difficulty = Difficulty::Tier(6);
        config.voice = Some("en-gb".to_string());
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        assert!(toml::from_str::<Config>(r#"difficulty = "9""#).is_err());
    }

    #[test]
    fn validate_clamps_values() {
        let mut config = Config::default();
        config.speech_rate = 12.0;
        config.speech_pitch = f32::NAN;
        config.silence_timeout_ms = 1;
        config.restart_backoff_ms = 0;
        config.tts_command = Some("  ".to_string());
        config.theme = String::new();
        config.validate();

        assert_eq!(config.speech_rate, 4.0);
        assert_eq!(config.speech_pitch, 1.0);
        assert_eq!(config.silence_timeout_ms, 500);
        assert_eq!(config.restart_backoff_ms, 50);
        assert_eq!(config.tts_command, None);
        assert_eq!(config.theme, "catppuccin-mocha");
    }

    #[test]
    fn timings_flow_into_trainer_settings() {
        let mut config = Config::default();
        config.silence_timeout_ms = 4500;
        config.auto_listen = false;
        let settings = config.trainer_settings();
        assert_eq!(settings.silence_timeout, Duration::from_millis(4500));
        assert!(!settings.auto_listen);
    }
}
