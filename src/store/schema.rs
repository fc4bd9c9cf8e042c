use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::stats::Stats;

pub const SCHEMA_VERSION: u32 = 1;

/// On-disk form of the practice counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsData {
    pub schema_version: u32,
    #[serde(flatten)]
    pub stats: Stats,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for StatsData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            stats: Stats::default(),
            updated_at: None,
        }
    }
}

impl StatsData {
    pub fn new(stats: Stats) -> Self {
        Self {
            stats,
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Written by a different layout; not safe to trust.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}
