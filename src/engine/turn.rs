#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnStatus {
    Idle,
    Correct,
    Incorrect,
    Revealed,
}

impl TurnStatus {
    /// Correct and revealed words take no further answers.
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnStatus::Correct | TurnStatus::Revealed)
    }
}

/// One word being practiced.
#[derive(Clone, Debug)]
pub struct Turn {
    pub word: String,
    pub status: TurnStatus,
    pub submitted: Option<String>,
    pub wrong_attempts: u32,
    pub hint_shown: bool,
}

impl Turn {
    pub fn new(word: String) -> Self {
        Self {
            word,
            status: TurnStatus::Idle,
            submitted: None,
            wrong_attempts: 0,
            hint_shown: false,
        }
    }

    pub fn hint_available(&self) -> bool {
        self.wrong_attempts >= 1 && !self.status.is_terminal()
    }

    pub fn hint(&self) -> String {
        hint_for(&self.word)
    }
}

/// First half of the word (rounded up) followed by one underscore per hidden character.
pub fn hint_for(word: &str) -> String {
    let len = word.chars().count();
    let shown = len.div_ceil(2);
    let mut hint: String = word.chars().take(shown).collect();
    hint.extend(std::iter::repeat_n('_', len / 2));
    hint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_reveals_first_half_rounded_up() {
        assert_eq!(hint_for("cat"), "ca_");
        assert_eq!(hint_for("moment"), "mom___");
        assert_eq!(hint_for("a"), "a");
        assert_eq!(hint_for(""), "");
    }

    #[test]
    fn hint_counts_characters_not_bytes() {
        assert_eq!(hint_for("señor"), "señ__");
        assert_eq!(hint_for("lo mein"), "lo m___");
    }

    #[test]
    fn hint_needs_a_wrong_attempt_and_an_open_turn() {
        let mut turn = Turn::new("tag".to_string());
        assert!(!turn.hint_available());
        turn.wrong_attempts = 1;
        turn.status = TurnStatus::Incorrect;
        assert!(turn.hint_available());
        turn.status = TurnStatus::Revealed;
        assert!(!turn.hint_available());
    }
}
