pub mod menu;
pub mod stats_header;
pub mod word_card;
