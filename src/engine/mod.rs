pub mod grader;
pub mod listening;
pub mod scheduler;
pub mod selector;
pub mod stats;
pub mod transcript;
pub mod trainer;
pub mod turn;
pub mod word_bank;

pub use trainer::{Notice, NoticeLevel, Trainer, TrainerSettings};
