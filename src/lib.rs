pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod extract;
pub mod index;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod timeouts;

#[cfg(test)]
mod errors_tests;

pub use config::AppConfig;
pub use errors::*;
