//! Edge types for the knowledge graph.
//!
//! Two edge types:
//! - [`EntityEdge`] — factual relationships between entities (bi-temporal)
//! - [`EpisodicEdge`] — MENTIONS relationships (episode → entity)

pub mod entity;
pub mod episodic;

pub use entity::EntityEdge;
pub use episodic::EpisodicEdge;
