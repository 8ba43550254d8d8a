//! Grounded answer generation through the response cache

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;

use super::GenerationParams;
use super::LanguageModel;
use super::LlmClient;
use crate::cache::ResponseCache;
use crate::errors::Result;
use crate::rag::prompts::build_grounded_prompt;
use crate::timeouts::bounded;

/// Turns retrieved contexts and a query into an answer
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
    cache: Option<ResponseCache>,
    params: GenerationParams,
    timeout: Duration,
}

impl AnswerGenerator {
    /// Build the configured HTTP model, opening the response cache when enabled
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let client = LlmClient::from_config(config)?;
        let generator = Self::with_model(
            Arc::new(client),
            GenerationParams::from_config(config),
            config.generate_timeout(),
        );

        if config.cache.enabled {
            Ok(generator.with_cache(ResponseCache::from_config(config).await?))
        } else {
            Ok(generator)
        }
    }

    pub fn with_model(
        model: Arc<dyn LanguageModel>,
        params: GenerationParams,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            cache: None,
            params,
            timeout,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Answer `query` grounded in `contexts`
    ///
    /// Model failures surface as they are; nothing is retried.
    pub async fn generate<S: AsRef<str>>(&self, contexts: &[S], query: &str) -> Result<String> {
        let prompt = build_grounded_prompt(contexts, query);
        debug!(
            "Generating answer with {} from {} contexts",
            self.model.model_name(),
            contexts.len()
        );

        let call = |prompt: String| async move {
            bounded(
                "generation",
                self.timeout,
                self.model.complete(&prompt, &self.params),
            )
            .await
        };

        let answer = match &self.cache {
            Some(cache) => cache.get_or_compute(&prompt, call).await?,
            None => call(prompt).await?,
        };

        info!("Generated answer ({} chars)", answer.len());
        Ok(answer)
    }
}
