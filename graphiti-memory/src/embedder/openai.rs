//! OpenAI embedding client.
//!
//! Wraps [`async_openai`] to provide [`EmbedderClient`] for the OpenAI
//! embeddings API, with chunked batch support, exponential-backoff retry on
//! network failures, and L2 normalization of every returned vector.

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::CreateEmbeddingRequestArgs, Client,
};
use backoff::{future::retry, ExponentialBackoffBuilder};
use std::time::Duration;

use crate::embedder::{EmbedderClient, Embedding};
use crate::errors::{GraphitiError, Result};
use crate::utils::normalize_l2;

/// Default embedding model name.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Maximum number of inputs per embeddings API call.
const BATCH_CHUNK_SIZE: usize = 2048;

/// Embedding dimension for a given model name. Falls back to 1536 (the
/// `text-embedding-3-small` dimension) for unrecognised models.
fn model_dim(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Classify an [`OpenAIError`] as transient (retry) or permanent.
fn classify_error(err: OpenAIError) -> backoff::Error<GraphitiError> {
    let msg = err.to_string();
    match &err {
        // Timeouts and connection failures are worth retrying.
        OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            backoff::Error::transient(GraphitiError::Embedder(msg))
        }
        // Auth errors, bad requests and the rest are permanent.
        _ => backoff::Error::permanent(GraphitiError::Embedder(msg)),
    }
}

/// OpenAI embedding client implementing [`EmbedderClient`].
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dim: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder.
    ///
    /// # Arguments
    /// * `api_key` – OpenAI API key (`sk-…`).
    /// * `model`   – Embedding model name (e.g. [`DEFAULT_MODEL`]).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dim = model_dim(&model);
        let config = OpenAIConfig::new().with_api_key(api_key.into());
        Self {
            client: Client::with_config(config),
            model,
            dim,
        }
    }

    /// Create an embedder pointing at a custom API base URL, for tests where
    /// a [`wiremock`] server stands in for the API.
    #[cfg(test)]
    fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let dim = model_dim(&model);
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(base_url.into());
        Self {
            client: Client::with_config(config),
            model,
            dim,
        }
    }

    /// One embeddings API call for up to [`BATCH_CHUNK_SIZE`] texts.
    ///
    /// Retries transient network failures with exponential backoff (initial
    /// 500 ms, cap 10 s, giving up after 60 s). Returned vectors are
    /// L2-normalized so downstream cosine ranking sees unit vectors.
    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        // Materialise owned data before entering the retry closure.
        let input: Vec<String> = texts.iter().map(|s| (*s).to_owned()).collect();
        let model = self.model.clone();
        let client = self.client.clone();

        retry(backoff_policy, move || {
            let input = input.clone();
            let model = model.clone();
            let client = client.clone();
            async move {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.as_str())
                    .input(input)
                    .build()
                    .map_err(|e| {
                        backoff::Error::permanent(GraphitiError::Embedder(e.to_string()))
                    })?;

                let response = client
                    .embeddings()
                    .create(request)
                    .await
                    .map_err(classify_error)?;

                let embeddings: Vec<Embedding> = response
                    .data
                    .into_iter()
                    .map(|item| {
                        let raw: Vec<f32> =
                            item.embedding.into_iter().map(|x| x as f32).collect();
                        normalize_l2(&raw)
                    })
                    .collect();

                Ok(embeddings)
            }
        })
        .await
    }
}

impl EmbedderClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_chunk(&[text]).await?;
        embeddings.pop().ok_or_else(|| {
            GraphitiError::Embedder("empty response from embedding API".to_string())
        })
    }

    /// Embed multiple texts, splitting into chunks of at most
    /// [`BATCH_CHUNK_SIZE`] items to respect per-call limits.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_CHUNK_SIZE) {
            let chunk_embeddings = self.embed_chunk(chunk).await?;
            result.extend(chunk_embeddings);
        }
        Ok(result)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
