//! Graph database driver abstraction.
//!
//! Defines the [`GraphDriver`] trait that backend implementations satisfy,
//! plus the Neo4j implementation.

pub mod neo4j;

pub use neo4j::Neo4jDriver;

use crate::errors::Result;

/// Trait representing a graph database backend.
#[allow(async_fn_in_trait)]
pub trait GraphDriver: Send + Sync {
    /// Health check — verify connectivity to the database.
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool / session.
    async fn close(&self) -> Result<()>;
}
