//! Embedding client abstraction.
//!
//! Embeddings power the semantic half of hybrid search: entity names and
//! facts are embedded at ingestion time, queries at search time.
//!
//! # Implementations
//! - [`openai::OpenAiEmbedder`] — OpenAI embeddings API via `async-openai`.

pub mod openai;

use crate::errors::Result;

/// A vector embedding (f32 components, L2-normalized).
pub type Embedding = Vec<f32>;

/// Trait for text-to-vector embedding clients.
#[allow(async_fn_in_trait)]
pub trait EmbedderClient: Send + Sync {
    /// Generate an embedding for a single text string.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for a batch of texts, one per input, in order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Dimensionality of embeddings produced by this client.
    fn dim(&self) -> usize;
}
