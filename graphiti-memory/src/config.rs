//! Configuration loaded from environment variables.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Central configuration for the graph store and the optional extraction stack.
///
/// Every field has a default, so [`GraphitiConfig::from_env`] never fails:
/// a wrong password or an unreachable database surfaces later, at connect
/// time, as a disconnected status rather than a startup abort.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GraphitiConfig {
    /// Neo4j connection URI. Env: `NEO4J_URI`, default `neo4j://127.0.0.1:7687`.
    #[validate(length(min = 1))]
    pub neo4j_uri: String,

    /// Neo4j username. Env: `NEO4J_USER`, default `neo4j`.
    #[validate(length(min = 1))]
    pub neo4j_user: String,

    /// Neo4j password. Env: `NEO4J_PASSWORD`, default empty.
    pub neo4j_password: String,

    /// OpenAI API key. Env: `OPENAI_API_KEY`. When absent, episodes are
    /// persisted without entity/relationship extraction.
    pub openai_api_key: Option<String>,

    /// Extraction model name. Env: `OPENAI_MODEL`, default `gpt-4o-mini`.
    #[validate(length(min = 1))]
    pub model_name: String,

    /// Embedding model name. Env: `OPENAI_EMBEDDING_MODEL`,
    /// default `text-embedding-3-small`.
    #[validate(length(min = 1))]
    pub embedding_model: String,

    /// Default group for episodes submitted without an explicit one.
    /// Env: `GRAPHITI_GROUP_ID`, default `default`.
    #[validate(length(min = 1))]
    pub group_id: String,
}

impl Default for GraphitiConfig {
    fn default() -> Self {
        Self {
            neo4j_uri: "neo4j://127.0.0.1:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: String::new(),
            openai_api_key: None,
            model_name: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            group_id: "default".to_string(),
        }
    }
}

impl GraphitiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent),
    /// then reads each variable, falling back to the defaults above. An
    /// `OPENAI_API_KEY` set to the empty string counts as absent.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        Self {
            neo4j_uri: env_or("NEO4J_URI", defaults.neo4j_uri),
            neo4j_user: env_or("NEO4J_USER", defaults.neo4j_user),
            neo4j_password: env_or("NEO4J_PASSWORD", defaults.neo4j_password),
            openai_api_key,
            model_name: env_or("OPENAI_MODEL", defaults.model_name),
            embedding_model: env_or("OPENAI_EMBEDDING_MODEL", defaults.embedding_model),
            group_id: env_or("GRAPHITI_GROUP_ID", defaults.group_id),
        }
    }

    /// Validate field shapes (non-empty URI, user, model names).
    ///
    /// Called by the connection bootstrap; a failure here becomes a
    /// disconnected status, never a panic.
    pub fn check(&self) -> crate::Result<()> {
        self.validate()
            .map_err(|e| crate::GraphitiError::Validation(e.to_string()))
    }

    /// Whether the semantic-extraction stack (LLM + embedder) is configured.
    pub fn extraction_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}
