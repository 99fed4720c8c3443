pub mod book;
pub mod clock;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod filter;
pub mod game;
pub mod generator;
pub mod labeler;
pub mod labeling;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod sampling;
pub mod settings;
pub mod writer;

#[cfg(test)]
mod testing;

pub use error::Error;
