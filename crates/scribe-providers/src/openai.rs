use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use scribe_core::{Completion, Error, Prompt, Result, ScribeConfig, TextRunner, TokenUsage};

/// Default chat-completions endpoint.
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default model when none is configured.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Env var consulted for the API key.
const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// System prompt used when a role supplies none.
const FALLBACK_SYSTEM_PROMPT: &str =
    "You are a documentation specialist. Produce clear, well-structured Markdown.";

/// Chat-completions backend for any `OpenAI`-compatible endpoint.
pub struct OpenAiRunner {
    /// HTTP client for API requests.
    client: Client,
    /// Bearer token.
    api_key: String,
    /// Model identifier sent with each request.
    model: String,
    /// Endpoint URL.
    base_url: String,
    /// Completion token cap per request.
    max_tokens: usize,
    /// Sampling temperature.
    temperature: f32,
}

impl OpenAiRunner {
    /// Creates a runner from environment variables with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the `OPENAI_API_KEY` environment variable is not set.
    pub fn new() -> Result<Self> {
        let api_key =
            env::var(ENV_API_KEY).map_err(|_| Error::MissingApiKey(ENV_API_KEY.to_owned()))?;

        Ok(Self {
            client: Client::default(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_API_URL.to_owned(),
            max_tokens: 4096,
            temperature: 0.7,
        })
    }

    /// Creates a runner from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] if neither the config nor the
    /// configured environment variable carries a key, or an error if the
    /// HTTP client cannot be built.
    pub fn from_config(config: &ScribeConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| Error::MissingApiKey(config.provider.api_key_env.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.provider.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.provider.model.clone(),
            base_url: config.provider.base_url.clone(),
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
        })
    }

    /// Sets the model to use for generation.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Sets the endpoint URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Request payload sent to the chat-completions API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    /// Model identifier understood by the endpoint.
    model: String,
    /// Messages that form the conversation for the request.
    messages: Vec<ChatMessage>,
    /// Sampling temperature controlling response randomness.
    temperature: f32,
    /// Maximum number of tokens allowed in the completion.
    max_tokens: usize,
}

/// Message delivered to the chat-completions API.
#[derive(Debug, Serialize)]
struct ChatMessage {
    /// Role of the message author (`system` or `user`).
    role: String,
    /// Textual content of the message.
    content: String,
}

/// Response payload returned by the endpoint.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// List of candidate completions.
    choices: Vec<ChatChoice>,
    /// Token accounting information for the request.
    usage: ChatUsage,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// Message generated for the choice.
    message: ChatResponseMessage,
}

/// Response message containing the generated text.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    /// Generated text content.
    content: String,
}

/// Token usage metrics for a response.
#[derive(Debug, Deserialize)]
struct ChatUsage {
    /// Number of tokens in the prompt portion of the request.
    prompt_tokens: usize,
    /// Number of tokens produced in the completion.
    completion_tokens: usize,
}

#[async_trait]
impl TextRunner for OpenAiRunner {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn run(&self, prompt: &Prompt) -> Result<Completion> {
        let start = Instant::now();

        let system_content = if prompt.system.is_empty() {
            FALLBACK_SYSTEM_PROMPT.to_owned()
        } else {
            prompt.system.clone()
        };

        let messages = vec![
            ChatMessage {
                role: "system".to_owned(),
                content: system_content,
            },
            ChatMessage {
                role: "user".to_owned(),
                content: prompt.text.clone(),
            },
        ];

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: prompt.temperature.unwrap_or(self.temperature),
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Provider(format!("chat request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(Error::Provider(format!(
                "chat API error {status}: {error_text}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("failed to parse response: {err}")))?;

        let latency_ms = start.elapsed().as_millis() as u64;

        let text = chat_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::InvalidResponse("no completion choices returned".to_owned()))?;

        let tokens_used = TokenUsage {
            input: chat_response.usage.prompt_tokens as u64,
            output: chat_response.usage.completion_tokens as u64,
        };

        Ok(Completion {
            text,
            tokens_used,
            provider: format!("openai/{}", self.model),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_with_key(api_key: &str) -> OpenAiRunner {
        OpenAiRunner {
            client: Client::default(),
            api_key: api_key.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_API_URL.to_owned(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    #[test]
    fn runner_identity() {
        let runner = runner_with_key("test_key").with_model("custom-model".to_owned());
        assert_eq!(runner.name(), "openai");
        assert_eq!(runner.model, "custom-model");
    }

    #[tokio::test]
    async fn availability_tracks_api_key() {
        assert!(runner_with_key("test_key").is_available().await);
        assert!(!runner_with_key("").is_available().await);
    }

    #[test]
    fn from_config_requires_key() {
        let mut config = ScribeConfig::default();
        config.provider.api_key = Some("configured_key".to_owned());
        config.provider.model = "local-test".to_owned();

        let runner = match OpenAiRunner::from_config(&config) {
            Ok(built) => built,
            Err(error) => panic!("expected runner from config: {error}"),
        };
        assert_eq!(runner.model, "local-test");

        config.provider.api_key = None;
        config.provider.api_key_env = "SCRIBE_TEST_UNSET_KEY_90211".to_owned();
        assert!(matches!(
            OpenAiRunner::from_config(&config),
            Err(Error::MissingApiKey(_))
        ));
    }
}
