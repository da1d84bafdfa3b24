//! EntityNode — represents a real-world entity extracted from episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A real-world entity (person, place, concept) extracted from episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    /// `"Entity"` plus the extracted entity type, when one was identified.
    pub labels: Vec<String>,
    pub summary: String,
    pub name_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl EntityNode {
    /// Build a new entity with a fresh uuid and `created_at = now`.
    pub fn new(
        name: impl Into<String>,
        group_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            labels: vec!["Entity".to_string()],
            summary: summary.into(),
            name_embedding: None,
            created_at: Utc::now(),
        }
    }
}
