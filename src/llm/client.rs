//! HTTP clients for chat-completion style endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::ChatMessage;
use super::GenerationParams;
use super::LanguageModel;
use crate::config::LlmProviderKind;
use crate::errors::Result;
use crate::errors::TableRagError;

/// Supported language model APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// `POST {endpoint}/chat/completions`
    OpenAiCompatible,
    /// `POST {endpoint}/models/{model}:generateContent`
    Gemini,
}

impl From<LlmProviderKind> for LlmProvider {
    fn from(kind: LlmProviderKind) -> Self {
        match kind {
            LlmProviderKind::OpenaiCompatible => Self::OpenAiCompatible,
            LlmProviderKind::Gemini => Self::Gemini,
        }
    }
}

/// Client for a remote language model
pub struct LlmClient {
    provider: LlmProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    system_prompt: Option<String>,
    timeout: Duration,
    client: Client,
}

fn failed(detail: impl Into<String>) -> TableRagError {
    TableRagError::GenerationFailed {
        status: None,
        detail: detail.into(),
    }
}

impl LlmClient {
    pub fn new(
        provider: LlmProvider,
        model: String,
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TableRagError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            system_prompt: None,
            timeout,
            client,
        })
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.llm.provider.into(),
            config.llm_model().to_string(),
            config.llm_endpoint().to_string(),
            config.llm.api_key.clone(),
            config.generate_timeout(),
        )?
        .with_system_prompt(config.llm.system_prompt.clone()))
    }

    /// Send `system_prompt` ahead of every user prompt
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    #[must_use]
    pub const fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn transport_error(&self, url: &str, err: &reqwest::Error) -> TableRagError {
        if err.is_timeout() {
            TableRagError::TimeoutExceeded {
                operation: format!("generation request to {url}"),
                limit_ms: self.timeout.as_millis(),
            }
        } else {
            failed(format!("{url}: {err}"))
        }
    }

    /// Turn a non-success response into `GenerationFailed` with its status and body
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(TableRagError::GenerationFailed {
            status: Some(status.as_u16()),
            detail,
        })
    }

    async fn complete_openai(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: AssistantMessage,
        }

        #[derive(Deserialize)]
        struct AssistantMessage {
            content: Option<String>,
        }

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {}", url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&url, &e))?;
        let response = Self::check_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| failed("No choices in response"))
    }

    async fn complete_gemini(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiRequest<'a> {
            contents: Vec<GeminiContent<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            system_instruction: Option<GeminiContent<'a>>,
            generation_config: GenerationConfig,
        }

        #[derive(Serialize)]
        struct GeminiContent<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            role: Option<&'a str>,
            parts: Vec<GeminiPart<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiPart<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f32,
            max_output_tokens: u32,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<CandidatePart>,
        }

        #[derive(Deserialize)]
        struct CandidatePart {
            text: Option<String>,
        }

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        debug!("Calling Gemini generateContent API: {}", url);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: prompt }],
            }],
            system_instruction: self.system_prompt.as_deref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.query(&[("key", api_key)]);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&url, &e))?;
        let response = Self::check_status(response).await?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("Failed to parse response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .find_map(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| failed("No candidates in response"))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAiCompatible => self.complete_openai(prompt, params).await,
            LlmProvider::Gemini => self.complete_gemini(prompt, params).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::body_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::matchers::query_param;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    use super::*;

    fn client(provider: LlmProvider, model: &str, server: &MockServer, key: Option<&str>) -> LlmClient {
        LlmClient::new(
            provider,
            model.to_string(),
            server.uri(),
            key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn params() -> GenerationParams {
        GenerationParams {
            temperature: 0.5,
            max_tokens: 300,
        }
    }

    #[tokio::test]
    async fn test_openai_compatible_request_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_json(serde_json::json!({
                "model": "mistral-7b-instruct-v0.1",
                "messages": [{"role": "user", "content": "Which shoe sells well?"}],
                "temperature": 0.5,
                "max_tokens": 300
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "The red shoe."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(LlmProvider::OpenAiCompatible, "mistral-7b-instruct-v0.1", &server, None)
            .complete("Which shoe sells well?", &params())
            .await
            .unwrap();
        assert_eq!(answer, "The red shoe.");
    }

    #[tokio::test]
    async fn test_openai_system_prompt_and_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.5,
                "max_tokens": 300
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let answer = client(LlmProvider::OpenAiCompatible, "gpt", &server, Some("sk-test"))
            .with_system_prompt(Some("Be brief.".to_string()))
            .complete("hi", &params())
            .await
            .unwrap();
        assert_eq!(answer, "hello");
    }

    #[tokio::test]
    async fn test_non_success_status_is_generation_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(LlmProvider::OpenAiCompatible, "m", &server, None)
            .complete("q", &params())
            .await
            .unwrap_err();
        match err {
            TableRagError::GenerationFailed { status, detail } => {
                assert_eq!(status, Some(429));
                assert_eq!(detail, "rate limited");
            }
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_generation_failed_without_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(LlmProvider::OpenAiCompatible, "m", &server, None)
            .complete("q", &params())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TableRagError::GenerationFailed { status: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_gemini_request_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "g-key"))
            .and(body_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Which shoe?"}]}],
                "generationConfig": {"temperature": 0.5, "maxOutputTokens": 300}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Red."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(LlmProvider::Gemini, "gemini-1.5-flash", &server, Some("g-key"))
            .complete("Which shoe?", &params())
            .await
            .unwrap();
        assert_eq!(answer, "Red.");
    }

    #[tokio::test]
    async fn test_gemini_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = client(LlmProvider::Gemini, "gemini-1.5-flash", &server, Some("bad"))
            .complete("q", &params())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TableRagError::GenerationFailed {
                status: Some(403),
                ..
            }
        ));
    }
}
