//! Ollama chat client shared by the LLM-backed ports.

use crate::error::{LedgerError, LedgerResult};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the model server.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.0,
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Ask the server to constrain output to JSON.
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Thin client for single-turn JSON chats.
pub struct OllamaClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Send a system + user prompt pair and return the reply text.
    pub async fn chat(&self, port: &'static str, system: &str, user: &str) -> LedgerResult<String> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending {} request to {}", port, url);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    format!("cannot connect to Ollama at {}", self.config.ollama_url)
                } else {
                    format!("failed to send request: {}", e)
                };
                LedgerError::Port { port, reason }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Port {
                port,
                reason: format!("Ollama API error {}: {}", status, body),
            });
        }

        let chat_response: OllamaChatResponse =
            response.json().await.map_err(|e| LedgerError::Port {
                port,
                reason: format!("failed to parse Ollama response: {}", e),
            })?;

        debug!("{} replied: {}", port, chat_response.message.content);
        Ok(chat_response.message.content)
    }
}

/// Locate the JSON object in a model reply, tolerating code fences and
/// surrounding prose.
pub fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

/// Parse a model reply into `T`, reporting failures as malformed port output.
pub fn parse_reply<T: DeserializeOwned>(port: &'static str, reply: &str) -> LedgerResult<T> {
    let json = extract_json(reply).ok_or_else(|| LedgerError::PortResponse {
        port,
        reason: "no JSON object in reply".to_string(),
    })?;

    serde_json::from_str(json).map_err(|e| LedgerError::PortResponse {
        port,
        reason: e.to_string(),
    })
}
