//! Entity and relationship extraction from episode content.
//!
//! The extraction client turns one episode (plus a window of previous
//! episodes for context) into an [`ExtractedGraph`]: entities with type
//! labels and summaries, and factual relationships between them.
//!
//! # Implementations
//! - [`openai::OpenAiExtractor`] — OpenAI chat completions via `async-openai`
//!   with `schemars`-generated JSON schemas for structured output.

pub mod openai;
pub mod prompts;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::nodes::{EpisodeType, EpisodicNode};

/// Speaker role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message for the extraction conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// An entity identified in an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedEntity {
    /// Canonical name as mentioned in the content.
    pub name: String,
    /// Broad type label, e.g. "Person", "Organization", "Concept".
    #[serde(default)]
    pub entity_type: String,
    /// One-sentence summary of what the episode says about the entity.
    #[serde(default)]
    pub summary: String,
}

/// A factual relationship between two extracted entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRelation {
    /// Name of the source entity, matching an entry in `entities`.
    pub source_entity: String,
    /// Name of the target entity, matching an entry in `entities`.
    pub target_entity: String,
    /// Relation label in UPPER_SNAKE_CASE, e.g. "WORKS_AT".
    pub relation: String,
    /// The fact as a standalone sentence.
    pub fact: String,
}

/// Everything extracted from a single episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedGraph {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

impl ExtractedGraph {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}

/// The episode being processed, as seen by the prompts.
#[derive(Debug, Clone)]
pub struct EpisodeContext<'a> {
    pub name: &'a str,
    pub content: &'a str,
    pub source: EpisodeType,
    pub source_description: &'a str,
    /// Recent episodes from the same group, oldest first.
    pub previous_episodes: &'a [EpisodicNode],
}

/// Extraction backend seam.
#[allow(async_fn_in_trait)]
pub trait ExtractionClient: Send + Sync {
    /// Extract entities and relationships from one episode.
    async fn extract(&self, episode: &EpisodeContext<'_>) -> Result<ExtractedGraph>;
}
