//! EpisodicEdge — MENTIONS relationship (EpisodicNode → EntityNode).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An edge representing a MENTIONS relationship from an episodic node to an entity node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicEdge {
    /// Unique identifier for this edge.
    pub uuid: Uuid,
    /// Group / partition this edge belongs to.
    pub group_id: String,
    /// UUID of the source EpisodicNode.
    pub source_node_uuid: Uuid,
    /// UUID of the target EntityNode.
    pub target_node_uuid: Uuid,
    /// When this edge was created in the graph.
    pub created_at: DateTime<Utc>,
}

impl EpisodicEdge {
    /// Build a new MENTIONS edge with a fresh uuid and `created_at = now`.
    pub fn new(
        source_node_uuid: Uuid,
        target_node_uuid: Uuid,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            group_id: group_id.into(),
            source_node_uuid,
            target_node_uuid,
            created_at: Utc::now(),
        }
    }
}
