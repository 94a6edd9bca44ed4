//! Turning chunks into invoice records through a backend.

mod client;
mod prompt;

pub use client::{ModelClient, RetryPolicy, records_from_json};
pub use prompt::Prompt;
