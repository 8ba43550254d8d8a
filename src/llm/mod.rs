//! Language model collaborators and answer generation
//!
//! - [`LanguageModel`] is the seam for any text completion backend
//! - [`LlmClient`] speaks the OpenAI-compatible chat API (LM Studio, vLLM,
//!   llama.cpp server, OpenAI itself) and Gemini's `generateContent`
//! - [`AnswerGenerator`] grounds a query in retrieved contexts and routes the
//!   call through the response cache
//!
//! # Examples
//!
//! ```rust,no_run
//! use tablerag::config::AppConfig;
//! use tablerag::llm::AnswerGenerator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let generator = AnswerGenerator::from_config(&config).await?;
//!
//!     let contexts = vec!["The red shoe sells well".to_string()];
//!     let answer = generator.generate(&contexts, "Which shoe sells well?").await?;
//!     println!("{answer}");
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generator;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use client::LlmClient;
pub use client::LlmProvider;
pub use generator::AnswerGenerator;

use crate::errors::Result;

/// Sampling parameters sent with every completion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 300,
        }
    }
}

impl GenerationParams {
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self {
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Prompt to text function provided by an external model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, returning the model's text verbatim
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    fn model_name(&self) -> &str;
}
