//! EntityEdge — bi-temporal factual relationship between EntityNodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A factual relationship between two entity nodes, with bi-temporal metadata.
///
/// - **Valid time** (`valid_at` / `invalid_at`): when the fact was true in the real world.
/// - **Transaction time** (`created_at` / `expired_at`): when the edge exists in the graph.
///
/// `fact_embedding` is never serialized: callers receive facts as readable
/// records, and the vector is persisted separately by the graph driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEdge {
    /// Unique identifier for this edge.
    pub uuid: Uuid,
    /// Group / partition this fact belongs to.
    pub group_id: String,
    /// UUID of the source EntityNode.
    pub source_node_uuid: Uuid,
    /// UUID of the target EntityNode.
    pub target_node_uuid: Uuid,
    /// Relationship label (e.g. "KNOWS", "WORKS_AT").
    pub name: String,
    /// Human-readable fact string.
    pub fact: String,
    /// Embedding vector for the fact. Excluded from serialized output.
    #[serde(skip_serializing, default)]
    pub fact_embedding: Option<Vec<f32>>,
    /// Uuids of the episodes that mention this fact.
    pub episodes: Vec<String>,
    /// When this edge was created in the graph (transaction-time start).
    pub created_at: DateTime<Utc>,
    /// When this edge was superseded in the graph (transaction-time end).
    pub expired_at: Option<DateTime<Utc>>,
    /// When the fact became true in the real world (valid-time start).
    pub valid_at: Option<DateTime<Utc>>,
    /// When the fact ceased to be true in the real world (valid-time end).
    pub invalid_at: Option<DateTime<Utc>>,
}

impl EntityEdge {
    /// Build a new edge with a fresh uuid, `created_at = now`, and open
    /// temporal bounds.
    pub fn new(
        source_node_uuid: Uuid,
        target_node_uuid: Uuid,
        name: impl Into<String>,
        fact: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            group_id: group_id.into(),
            source_node_uuid,
            target_node_uuid,
            name: name.into(),
            fact: fact.into(),
            fact_embedding: None,
            episodes: Vec::new(),
            created_at: Utc::now(),
            expired_at: None,
            valid_at: None,
            invalid_at: None,
        }
    }
}
