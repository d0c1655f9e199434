//! LLM resource abstraction
//!
//! [`LlmResource`] is the opaque handle `reason(...)` and agent `chat(...)`
//! depend on. The built-in [`HttpLlmResource`] speaks the OpenAI-compatible
//! chat-completions shape used by LM Studio, Ollama, llama.cpp, and vLLM,
//! following the same request/response layout and retry strategy as the
//! streaming client this runtime's HTTP stack was adapted from, simplified
//! to a single non-streaming call. [`MockLlmResource`] backs `DANA_MOCK_LLM`
//! and tests with a deterministic echo.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::DanaConfig;
use crate::error::{DanaError, Result};
use crate::promise::Promise;
use crate::retry::{RetryConfig, retry_with_backoff_conditional};

/// Opaque handle used by `reason(...)` and agent `chat(...)`.
#[async_trait]
pub trait LlmResource: Send + Sync {
    /// Always `"llm"` for every implementation the runtime ships.
    fn kind(&self) -> &'static str {
        "llm"
    }

    /// Model identifier, used only for logging.
    fn model(&self) -> &str;

    async fn chat_completion(&self, prompt: &str, system_prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Built-in OpenAI-compatible chat-completions client.
pub struct HttpLlmResource {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    retry_config: RetryConfig,
}

impl HttpLlmResource {
    pub fn new(config: &DanaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(DanaError::from)?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            api_key: config.api_key().to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    async fn send_once(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        debug!("POST {url} model={}", self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DanaError::runtime(format!(
                "HTTP error: {status} {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DanaError::runtime("LLM response contained no choices"))
    }
}

#[async_trait]
impl LlmResource for HttpLlmResource {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_completion(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        let config = self.retry_config.clone();
        retry_with_backoff_conditional(config, || self.send_once(prompt, system_prompt)).await
    }
}

/// Deterministic mock used by `DANA_MOCK_LLM` and tests.
pub struct MockLlmResource {
    model: String,
}

impl MockLlmResource {
    pub fn new() -> Self {
        Self {
            model: "mock-llm".to_string(),
        }
    }
}

impl Default for MockLlmResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmResource for MockLlmResource {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_completion(&self, prompt: &str, _system_prompt: &str) -> Result<String> {
        Ok(format!("[mock response to: {prompt}]"))
    }
}

/// Owns a dedicated background Tokio runtime so LLM calls run off the
/// interpreter's synchronous control path. Results are delivered back to
/// [`Promise`] instances over a one-shot channel.
pub struct LlmExecutor {
    runtime: tokio::runtime::Runtime,
}

impl LlmExecutor {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| DanaError::runtime(format!("failed to start LLM worker runtime: {e}")))?;
        Ok(Self { runtime })
    }

    /// Spawn a `chat_completion` call on the background runtime and return a
    /// `Promise` that resolves once it completes.
    pub fn spawn_chat_completion(
        &self,
        resource: std::sync::Arc<dyn LlmResource>,
        prompt: String,
        system_prompt: String,
        label: &str,
    ) -> Promise {
        let (tx, rx): (
            Sender<std::result::Result<String, String>>,
            Receiver<std::result::Result<String, String>>,
        ) = channel();

        self.runtime.spawn(async move {
            let result = resource
                .chat_completion(&prompt, &system_prompt)
                .await
                .map_err(|e| e.to_string());
            if tx.send(result).is_err() {
                warn!("LLM result dropped: receiving Promise was discarded");
            }
        });

        Promise::pending(label, rx)
    }

    /// Block the calling thread on `fut`, running it on the background
    /// runtime. Used by the transcoder, which needs a translation result
    /// before parsing can proceed (unlike `reason`/`chat`, which hand back a
    /// `Promise` immediately).
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}
