use std::collections::HashSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::engine::word_bank::{Difficulty, WordBank};

/// Draws practice words without repeating any until the active tier is exhausted.
pub struct WordSelector {
    shown: HashSet<String>,
    tier: Difficulty,
    rng: SmallRng,
}

impl WordSelector {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            shown: HashSet::new(),
            tier: Difficulty::All,
            rng,
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_entropy())
    }

    pub fn shown(&self) -> &HashSet<String> {
        &self.shown
    }

    pub fn reset(&mut self) {
        self.shown.clear();
    }

    pub fn next(&mut self, bank: &WordBank, difficulty: Difficulty) -> Option<String> {
        if difficulty != self.tier {
            self.tier = difficulty;
            self.shown.clear();
        }
        let pool = bank.slice(difficulty);
        let word = next_word(pool, &mut self.shown, &mut self.rng)?;
        Some(word.to_string())
    }
}

/// Pick uniformly among `pool` words not in `shown`; once every word has been
/// shown, start a fresh cycle over the whole pool.
pub fn next_word<'a, R: Rng>(
    pool: &'a [String],
    shown: &mut HashSet<String>,
    rng: &mut R,
) -> Option<&'a str> {
    if pool.is_empty() {
        return None;
    }

    let fresh: Vec<&String> = pool.iter().filter(|w| !shown.contains(*w)).collect();
    let word = if fresh.is_empty() {
        shown.clear();
        &pool[rng.gen_range(0..pool.len())]
    } else {
        fresh[rng.gen_range(0..fresh.len())]
    };

    shown.insert(word.clone());
    Some(word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> WordSelector {
        WordSelector::new(SmallRng::seed_from_u64(7))
    }

    fn numbered(n: usize) -> WordBank {
        WordBank::from_words((0..n).map(|i| format!("w{i}")))
    }

    #[test]
    fn never_leaves_the_active_tier() {
        let bank = numbered(60);
        let mut selector = seeded();
        let tier = bank.slice(Difficulty::Tier(3)).to_vec();
        for _ in 0..100 {
            let word = selector.next(&bank, Difficulty::Tier(3)).unwrap();
            assert!(tier.contains(&word), "{word} outside tier 3");
        }
    }

    #[test]
    fn no_repeats_until_exhausted() {
        let bank = numbered(12);
        let mut selector = seeded();
        let mut cycle = HashSet::new();
        for _ in 0..12 {
            assert!(cycle.insert(selector.next(&bank, Difficulty::All).unwrap()));
        }
        assert_eq!(cycle.len(), 12);
        assert_eq!(selector.shown().len(), 12);
    }

    #[test]
    fn exhaustion_starts_a_new_cycle_covering_everything() {
        let bank = numbered(5);
        let mut selector = seeded();
        for _ in 0..5 {
            selector.next(&bank, Difficulty::All);
        }

        // Sixth draw restarts the cycle and is recorded in the fresh set.
        selector.next(&bank, Difficulty::All).unwrap();
        assert_eq!(selector.shown().len(), 1);

        let mut second_cycle: HashSet<String> = selector.shown().clone();
        for _ in 0..4 {
            second_cycle.insert(selector.next(&bank, Difficulty::All).unwrap());
        }
        assert_eq!(second_cycle.len(), 5);
    }

    #[test]
    fn changing_tier_clears_shown() {
        let bank = numbered(30);
        let mut selector = seeded();
        selector.next(&bank, Difficulty::Tier(1));
        selector.next(&bank, Difficulty::Tier(1));
        assert_eq!(selector.shown().len(), 2);

        selector.next(&bank, Difficulty::Tier(2));
        assert_eq!(selector.shown().len(), 1);
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let mut selector = seeded();
        assert!(selector.next(&WordBank::from_words(Vec::<String>::new()), Difficulty::All).is_none());
        assert!(selector.next(&numbered(2), Difficulty::Tier(6)).is_none());
    }

    #[test]
    fn single_word_pool_repeats_that_word() {
        let bank = WordBank::from_words(["only"]);
        let mut selector = seeded();
        for _ in 0..3 {
            assert_eq!(selector.next(&bank, Difficulty::All).as_deref(), Some("only"));
        }
    }
}
