// The binary (main.rs) owns the terminal front end; everything it drives lives
// here so integration tests and benchmarks can reach it.

pub mod config;
pub mod engine;
pub mod speech;
pub mod store;
