pub mod aggregation;
pub mod cache;
pub mod config;
pub mod error;
pub mod heatmap;
pub mod hooks;
pub mod identity;
pub mod jobs;
pub mod matches;
pub mod mongo;
pub mod operations;
pub mod player;
pub mod queries;
pub mod relay;
pub mod render;
pub mod store;

#[cfg(test)]
mod test;

pub use error::{Error, Result};
