//! Ollama backend for local/self-hosted models.
//!
//! Talks to Ollama's `/api/chat` endpoint with non-streaming requests.
//! See: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::traits::{Backend, Generation};
use crate::types::ModelDescriptor;
use crate::{MimirError, Result};

/// Default base URL for a local Ollama daemon.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Transport-level safety net; the router applies the per-model
/// deadline separately.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend for Ollama-served models.
#[derive(Clone)]
pub struct OllamaBackend {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatRequestOptions,
}

#[derive(Serialize)]
struct ChatRequestOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize, Default)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaBackend {
    /// Create a backend against the default local daemon.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a backend with a custom base URL (for remote daemons and
    /// wiremock tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Check daemon responsiveness via the model listing endpoint.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MimirError::Http(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(MimirError::Api {
                status: response.status().as_u16(),
                message: "Ollama health check failed".to_owned(),
            })
        }
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, model: &ModelDescriptor, prompt: &str) -> Result<Generation> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = model.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&ChatRequest {
                model: &model.model_name,
                messages,
                stream: false,
                options: ChatRequestOptions {
                    temperature: model.temperature,
                    num_predict: model.max_tokens,
                },
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MimirError::Timeout {
                        model: model.id.clone(),
                    }
                } else {
                    MimirError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MimirError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| MimirError::Http(e.to_string()))?;

        if body.message.content.is_empty() {
            return Err(MimirError::EmptyResponse);
        }

        Ok(Generation {
            text: body.message.content,
            tokens_used: body.prompt_eval_count + body.eval_count,
        })
    }
}
