//! Text-generation backends.
//!
//! The agents and the report generator only see the [`TextGenerator`] trait;
//! a single client is built at startup and shared behind an `Arc`.

pub mod client;
pub mod ollama;
pub mod openai;

#[cfg(test)]
pub mod testing;

pub use client::{build_client, ClientConfig, GenerationRequest, Provider, TextGenerator};
