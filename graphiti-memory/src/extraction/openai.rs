//! OpenAI extraction client.
//!
//! Uses `async-openai` for chat completions with schema-constrained output,
//! `moka` for response caching, and `backoff` for exponential-backoff retry
//! on transient failures.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use moka::future::Cache;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::{GraphitiError, LlmError, Result};
use crate::utils::extract_json_from_response;

use super::{prompts, EpisodeContext, ExtractedGraph, ExtractionClient, Message, Role};

// ── Cache configuration ─────────────────────────────────────────────────

/// Configuration for the in-process response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries held in memory.
    pub max_capacity: u64,
    /// How long each entry lives before eviction.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            ttl: Duration::from_secs(3_600), // 1 hour
        }
    }
}

// ── Client struct ───────────────────────────────────────────────────────

/// Extraction client backed by the OpenAI chat completions API.
pub struct OpenAiExtractor {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    /// Keyed by `md5(model + messages)` → normalized [`ExtractedGraph`] JSON.
    cache: Cache<String, String>,
}

impl OpenAiExtractor {
    /// Create a new extractor.
    ///
    /// # Arguments
    /// * `api_key` – OpenAI secret key.
    /// * `model`   – Model name (e.g. `"gpt-4o-mini"`).
    /// * `cache_config` – Cache capacity and TTL.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        cache_config: CacheConfig,
    ) -> Self {
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        let client = async_openai::Client::with_config(config);

        let cache = Cache::builder()
            .max_capacity(cache_config.max_capacity)
            .time_to_live(cache_config.ttl)
            .build();

        Self {
            client,
            model: model.into(),
            temperature: 0.0,
            max_tokens: 8_192,
            cache,
        }
    }

    /// Override the sampling temperature (default `0.0`).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the max output token limit (default `8192`).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    /// MD5 cache key from model + message sequence.
    fn cache_key(&self, messages: &[Message]) -> String {
        use md5::{Digest, Md5};
        let mut h = Md5::new();
        h.update(self.model.as_bytes());
        for m in messages {
            h.update(role_str(&m.role).as_bytes());
            h.update(m.content.as_bytes());
        }
        format!("{:x}", h.finalize())
    }

    /// Serialize a [`Message`] slice into the JSON array the API expects.
    fn messages_to_json(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                json!({
                    "role": role_str(&m.role),
                    "content": m.content,
                })
            })
            .collect()
    }

    /// Call the chat completions endpoint with exponential-backoff retry.
    ///
    /// Retries rate limits and network-level failures; everything else is
    /// permanent.
    async fn call_with_retry(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(Some(Duration::from_secs(300)))
            .build();

        backoff::future::retry(backoff, || async {
            let outcome: std::result::Result<serde_json::Value, async_openai::error::OpenAIError> =
                self.client.chat().create_byot(request.clone()).await;

            match outcome {
                Ok(response) => Ok(response),
                Err(e) => {
                    let llm_err = map_openai_error(e);
                    if llm_err.is_transient() {
                        warn!(error = %llm_err, "transient OpenAI error, retrying with backoff");
                        Err(backoff::Error::transient(llm_err))
                    } else {
                        Err(backoff::Error::permanent(llm_err))
                    }
                }
            }
        })
        .await
        .map_err(GraphitiError::Llm)
    }

    /// Extract the assistant message text from a chat-completions response.
    fn extract_content(response: &serde_json::Value) -> Result<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or(GraphitiError::Llm(LlmError::EmptyResponse))
    }
}

impl ExtractionClient for OpenAiExtractor {
    async fn extract(&self, episode: &EpisodeContext<'_>) -> Result<ExtractedGraph> {
        let messages = prompts::extraction_messages(episode);
        let key = self.cache_key(&messages);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("extraction cache hit");
            return serde_json::from_str(&cached).map_err(GraphitiError::Serialization);
        }

        let schema = schemars::schema_for!(ExtractedGraph);
        let schema_value = serde_json::to_value(&schema)?;

        let request = json!({
            "model": self.model,
            "messages": Self::messages_to_json(&messages),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "extracted_graph",
                    "schema": schema_value,
                    "strict": true,
                }
            }
        });

        let response = self.call_with_retry(request).await?;
        let content = Self::extract_content(&response)?;
        let graph = parse_graph(&content)?;

        // Cache the normalized form so hits never re-run the fence fallback.
        self.cache.insert(key, serde_json::to_string(&graph)?).await;

        Ok(graph)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Parse the model output, tolerating markdown fences around the JSON body.
fn parse_graph(content: &str) -> Result<ExtractedGraph> {
    match serde_json::from_str(content) {
        Ok(graph) => Ok(graph),
        Err(err) => {
            if let Some(body) = extract_json_from_response(content) {
                if let Ok(graph) = serde_json::from_str(body) {
                    return Ok(graph);
                }
            }
            Err(GraphitiError::Serialization(err))
        }
    }
}

/// Map an [`async_openai::error::OpenAIError`] to our [`LlmError`] domain type.
///
/// The API error body carries no HTTP status, so classification goes by the
/// error type and message text.
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match err {
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or("");
            let lower = api.message.to_lowercase();
            if kind == "requests" || kind == "tokens" || lower.contains("rate limit") {
                LlmError::RateLimit
            } else if kind == "authentication_error"
                || lower.contains("api key")
                || lower.contains("unauthorized")
                || lower.contains("authentication")
            {
                LlmError::Authentication
            } else {
                LlmError::Api(api.message)
            }
        }
        OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            LlmError::Network(e.to_string())
        }
        other => LlmError::Api(other.to_string()),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
