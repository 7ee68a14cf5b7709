//! Completion providers for reply generation
//!
//! Each configured API key becomes one [`ChatCompletionsProvider`] talking to
//! an OpenAI-compatible `/chat/completions` endpoint (Gemini's compatibility
//! layer by default). Providers are tried strictly in order by
//! [`ProviderPool::complete_first`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::utils::error::ProviderError;

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Output length ceiling, in tokens
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

/// A single fallible completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Successful completion and the provider that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub provider: String,
    pub text: String,
}

/// Ordered providers; order is the trial order
#[derive(Default)]
pub struct ProviderPool {
    providers: Vec<Box<dyn CompletionProvider>>,
}

impl ProviderPool {
    pub fn new(providers: Vec<Box<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// One chat-completions provider per non-empty API key
    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let mut providers: Vec<Box<dyn CompletionProvider>> = Vec::new();
        for (i, key) in config.api_keys.iter().enumerate() {
            if key.trim().is_empty() {
                continue;
            }
            let provider = ChatCompletionsProvider::new(
                format!("provider-{}", i + 1),
                &config.base_url,
                key.trim(),
                &config.model,
                Duration::from_secs(config.timeout_secs),
            )?;
            providers.push(Box::new(provider));
        }

        if providers.is_empty() {
            warn!("No completion providers configured; replies will use fallback text");
        } else {
            debug!(count = providers.len(), model = %config.model, "Completion providers ready");
        }

        Ok(Self { providers })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try providers in order, returning the first success
    ///
    /// When every provider fails the last error is returned.
    pub async fn complete_first(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let mut last_error = ProviderError::NoProviders;

        for provider in &self.providers {
            match provider.complete(request).await {
                Ok(text) => {
                    debug!(provider = provider.name(), "Completion succeeded");
                    return Ok(Completion {
                        provider: provider.name().to_string(),
                        text,
                    });
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "Completion failed, trying next provider");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions backend
pub struct ChatCompletionsProvider {
    name: String,
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            name: name.into(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| ProviderError::Decode(format!("invalid API key header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: &request.stop,
        };

        debug!(provider = %self.name, model = %self.model, "Chat completion request");

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "be brief".to_string(),
            user_prompt: "reply to this".to_string(),
            max_tokens: 40,
            temperature: 0.8,
            stop: vec!["\n".to_string()],
        }
    }

    struct Scripted {
        name: String,
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(ProviderError::EmptyResponse)
        }
    }

    fn scripted(name: &str, reply: Option<&str>, calls: &Arc<AtomicUsize>) -> Box<dyn CompletionProvider> {
        Box::new(Scripted {
            name: name.to_string(),
            reply: reply.map(String::from),
            calls: Arc::clone(calls),
        })
    }

    #[tokio::test]
    async fn test_pool_short_circuits_on_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = ProviderPool::new(vec![
            scripted("a", None, &calls),
            scripted("b", Some("hello"), &calls),
            scripted("c", Some("unused"), &calls),
        ]);

        let completion = pool.complete_first(&request()).await.unwrap();
        assert_eq!(completion.provider, "b");
        assert_eq!(completion.text, "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_pool_reports_no_providers() {
        let pool = ProviderPool::default();
        let err = pool.complete_first(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoProviders));
    }

    #[tokio::test]
    async fn test_chat_completion_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer key-1"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 40,
                "stop": ["\n"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  nice one  "}}]
            })))
            .mount(&server)
            .await;

        let provider = ChatCompletionsProvider::new(
            "p1",
            &server.uri(),
            "key-1",
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap();

        let text = provider.complete(&request()).await.unwrap();
        assert_eq!(text, "nice one");
    }

    #[tokio::test]
    async fn test_chat_completion_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let provider =
            ChatCompletionsProvider::new("p1", &server.uri(), "k", "m", Duration::from_secs(5))
                .unwrap();

        match provider.complete(&request()).await {
            Err(ProviderError::Api { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("quota"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_completion_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": null}}]
            })))
            .mount(&server)
            .await;

        let provider =
            ChatCompletionsProvider::new("p1", &server.uri(), "k", "m", Duration::from_secs(5))
                .unwrap();

        assert!(matches!(
            provider.complete(&request()).await,
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn test_from_config_skips_blank_keys() {
        let config = LlmConfig {
            api_keys: vec!["a".into(), "  ".into(), "b".into()],
            ..LlmConfig::default()
        };
        let pool = ProviderPool::from_config(&config).unwrap();
        assert_eq!(pool.len(), 2);
    }
}
