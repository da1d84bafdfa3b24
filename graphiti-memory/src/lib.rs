//! # graphiti-memory
//!
//! Temporally-aware knowledge graph memory for AI agents, backed by Neo4j.
//!
//! ## Architecture
//!
//! - **Episodic ingestion**: Raw episodes persist first, extraction enriches them afterwards
//! - **LLM-powered extraction**: Entities and facts pulled from episode text with schema-constrained output
//! - **Hybrid retrieval**: Lucene fulltext + vector cosine similarity, fused with reciprocal rank fusion
//! - **Graceful degradation**: Without an OpenAI key the store still ingests episodes and serves keyword search

pub mod config;
pub mod edges;
pub mod errors;
pub mod nodes;

pub mod driver;
pub mod embedder;
pub mod extraction;

pub mod search;
pub mod utils;

pub mod graphiti;

// Re-export the main facade
pub use config::GraphitiConfig;
pub use edges::EntityEdge;
pub use errors::{GraphitiError, LlmError, Result};
pub use graphiti::{Graphiti, NewEpisode};
pub use nodes::{EntityNode, EpisodeType, EpisodicNode};
pub use search::NodeResult;
