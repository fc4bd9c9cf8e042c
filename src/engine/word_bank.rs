use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

const WORDS_DEFAULT: &str = include_str!("../../assets/words.json");

pub const TIER_COUNT: u8 = 6;

/// Which slice of the catalog words are drawn from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Difficulty {
    #[default]
    All,
    /// One of the six contiguous pages, 1 (easiest) through 6.
    Tier(u8),
}

impl Difficulty {
    pub const ALL_CHOICES: [Difficulty; 7] = [
        Difficulty::All,
        Difficulty::Tier(1),
        Difficulty::Tier(2),
        Difficulty::Tier(3),
        Difficulty::Tier(4),
        Difficulty::Tier(5),
        Difficulty::Tier(6),
    ];

    pub fn label(self) -> String {
        match self {
            Difficulty::All => format!("All (1-{TIER_COUNT})"),
            Difficulty::Tier(1) => "Page 1 (Easy)".to_string(),
            Difficulty::Tier(n) if n == TIER_COUNT => format!("Page {n} (Hard)"),
            Difficulty::Tier(n) => format!("Page {n}"),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::All => f.write_str("all"),
            Difficulty::Tier(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Difficulty::All);
        }
        match s.parse::<u8>() {
            Ok(n) if (1..=TIER_COUNT).contains(&n) => Ok(Difficulty::Tier(n)),
            _ => bail!("difficulty must be \"all\" or 1-{TIER_COUNT}, got {s:?}"),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.to_string()
    }
}

/// The practice catalog. Order matters: tiers are positional.
#[derive(Clone, Debug)]
pub struct WordBank {
    words: Vec<String>,
}

impl WordBank {
    pub fn load_default() -> Self {
        let words: Vec<String> = serde_json::from_str(WORDS_DEFAULT).unwrap_or_default();
        Self::from_words(words)
    }

    /// Accepts either a JSON array of strings or plain text with one word per line.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading word list {}", path.display()))?;
        let words: Vec<String> = if content.trim_start().starts_with('[') {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing word list {}", path.display()))?
        } else {
            content.lines().map(str::to_string).collect()
        };
        let bank = Self::from_words(words);
        if bank.is_empty() {
            bail!("word list {} contains no words", path.display());
        }
        Ok(bank)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words
            .into_iter()
            .map(Into::into)
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The words belonging to `difficulty`. Tier pages are `ceil(len / 6)`
    /// long, so the last page may be short or, for tiny catalogs, empty.
    pub fn slice(&self, difficulty: Difficulty) -> &[String] {
        match difficulty {
            Difficulty::All => &self.words,
            Difficulty::Tier(n) => {
                let page = self.words.len().div_ceil(TIER_COUNT as usize);
                let start = (n.saturating_sub(1) as usize * page).min(self.words.len());
                let end = (start + page).min(self.words.len());
                &self.words[start..end]
            }
        }
    }
}
