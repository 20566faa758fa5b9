//! Calls to external language-model and embedding services.

pub mod client;
pub mod embeddings;
pub mod json;
pub mod places;

pub use client::{GenerateOptions, Generation, LlmClient};
