//! Error types for graphiti-memory.

/// Alias for Results returning [`GraphitiError`].
pub type Result<T> = std::result::Result<T, GraphitiError>;

/// Top-level error type for graphiti-memory.
#[derive(Debug, thiserror::Error)]
pub enum GraphitiError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),
}

/// Build a [`GraphitiError::Driver`] from any displayable source.
///
/// `neo4rs` surfaces several distinct error types (connection, protocol,
/// row deserialization); they all collapse to the driver variant here.
pub(crate) fn driver_err(e: impl std::fmt::Display) -> GraphitiError {
    GraphitiError::Driver(e.to_string())
}

/// LLM-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited")]
    RateLimit,

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("Authentication failed")]
    Authentication,

    /// Network-level failure (timeout, connection refused). Transient.
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}

impl LlmError {
    /// Whether a retry with backoff is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimit | LlmError::Network(_))
    }
}
