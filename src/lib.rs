//! Library entrypoint for marketpulse.
//!
//! The engine is exposed as plain modules so integration tests under
//! `tests/` can drive the batch runner and signal pipeline with their own
//! repositories, providers, and clocks.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::EngineError;
