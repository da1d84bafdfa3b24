//! EpisodicNode — represents an ingested data episode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The source type of an episode.
///
/// Serialized in lowercase (`"text"`, `"message"`, `"json"`) both in the
/// graph store and on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    Message,
    Json,
    #[default]
    Text,
}

impl EpisodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeType::Message => "message",
            EpisodeType::Json => "json",
            EpisodeType::Text => "text",
        }
    }

    /// Lenient parse: unknown strings fall back to `Text`.
    pub fn parse(s: &str) -> Self {
        match s {
            "message" => EpisodeType::Message,
            "json" => EpisodeType::Json,
            _ => EpisodeType::Text,
        }
    }
}

/// An ingested data episode (message, document, JSON record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub source: EpisodeType,
    pub source_description: String,
    pub content: String,
    /// When the events described by the episode occurred. For live
    /// ingestion this is the submission time, not the processing time.
    pub valid_at: DateTime<Utc>,
    /// Uuids of the entity edges extracted from this episode.
    pub entity_edges: Vec<String>,
}

impl EpisodicNode {
    /// Build a new episode with a fresh uuid and `created_at = now`.
    pub fn new(
        name: impl Into<String>,
        group_id: impl Into<String>,
        source: EpisodeType,
        source_description: impl Into<String>,
        content: impl Into<String>,
        valid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            labels: vec!["Episodic".to_string()],
            created_at: Utc::now(),
            source,
            source_description: source_description.into(),
            content: content.into(),
            valid_at,
            entity_edges: Vec::new(),
        }
    }
}
