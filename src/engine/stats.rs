use serde::{Deserialize, Serialize};

/// Running practice counters. Only ever reset by an explicit user action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub correct: u32,
    pub total: u32,
    pub streak: u32,
    #[serde(default)]
    pub best_streak: u32,
}

impl Stats {
    pub fn record_correct(&mut self) {
        self.correct += 1;
        self.total += 1;
        self.streak += 1;
        self.best_streak = self.best_streak.max(self.streak);
    }

    pub fn record_incorrect(&mut self) {
        self.total += 1;
        self.streak = 0;
    }

    pub fn break_streak(&mut self) {
        self.streak = 0;
    }

    /// Percentage of graded answers that were right; 0 before any answer.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}
