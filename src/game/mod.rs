pub mod constants;
pub mod engine;
pub mod grid;
pub mod input;
pub mod speed;
pub mod types;
