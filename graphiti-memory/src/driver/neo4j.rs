//! Neo4j graph driver.
//!
//! Uses `neo4rs` for async, pooled Bolt connections. All reads return scalar
//! columns rather than raw node/relationship values, and timestamps are
//! stored as fixed-width ISO 8601 strings so Cypher range comparisons and
//! `ORDER BY` work lexicographically.

use chrono::{DateTime, Utc};
use neo4rs::{query, Graph, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::driver::GraphDriver;
use crate::edges::{EntityEdge, EpisodicEdge};
use crate::errors::{driver_err, GraphitiError, Result};
use crate::nodes::{EntityNode, EpisodeType, EpisodicNode};
use crate::search::{ScoredEdge, ScoredNode};
use crate::utils::{format_neo4j_datetime, parse_flexible_datetime};

/// Names of the full-text indices queried by the search layer.
pub const NODE_FULLTEXT_INDEX: &str = "node_name_and_summary";
pub const EDGE_FULLTEXT_INDEX: &str = "edge_name_and_fact";

/// Index DDL executed on startup. Every statement is `IF NOT EXISTS`, so the
/// whole list is safe to replay against a populated database.
const INDEX_STATEMENTS: &[&str] = &[
    // Range indices for lookups and group scoping.
    "CREATE INDEX entity_uuid IF NOT EXISTS FOR (n:Entity) ON (n.uuid)",
    "CREATE INDEX entity_group_id IF NOT EXISTS FOR (n:Entity) ON (n.group_id)",
    "CREATE INDEX entity_name IF NOT EXISTS FOR (n:Entity) ON (n.name)",
    "CREATE INDEX entity_created_at IF NOT EXISTS FOR (n:Entity) ON (n.created_at)",
    "CREATE INDEX episode_uuid IF NOT EXISTS FOR (n:Episodic) ON (n.uuid)",
    "CREATE INDEX episode_group_id IF NOT EXISTS FOR (n:Episodic) ON (n.group_id)",
    "CREATE INDEX episode_valid_at IF NOT EXISTS FOR (n:Episodic) ON (n.valid_at)",
    "CREATE INDEX relation_uuid IF NOT EXISTS FOR ()-[e:RELATES_TO]-() ON (e.uuid)",
    "CREATE INDEX mention_uuid IF NOT EXISTS FOR ()-[e:MENTIONS]-() ON (e.uuid)",
    // Full-text indices backing keyword search.
    "CREATE FULLTEXT INDEX node_name_and_summary IF NOT EXISTS \
     FOR (n:Entity) ON EACH [n.name, n.summary]",
    "CREATE FULLTEXT INDEX edge_name_and_fact IF NOT EXISTS \
     FOR ()-[e:RELATES_TO]-() ON EACH [e.name, e.fact]",
    "CREATE FULLTEXT INDEX episode_content IF NOT EXISTS \
     FOR (n:Episodic) ON EACH [n.content, n.source_description]",
];

/// Async Neo4j driver over a lazy `neo4rs` connection pool.
pub struct Neo4jDriver {
    graph: Graph,
}

impl Neo4jDriver {
    /// Open a connection pool. The pool connects lazily; call
    /// [`GraphDriver::ping`] to force a round-trip.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphitiError::Driver(format!("failed to open {uri}: {e}")))?;
        Ok(Self { graph })
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    /// Create all range and full-text indices.
    pub async fn build_indices_and_constraints(&self) -> Result<()> {
        for stmt in INDEX_STATEMENTS {
            self.graph.run(query(stmt)).await.map_err(driver_err)?;
        }
        info!(count = INDEX_STATEMENTS.len(), "graph indices ensured");
        Ok(())
    }

    /// Delete every node and relationship in the database.
    pub async fn clear_data(&self) -> Result<()> {
        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(driver_err)
    }

    // ── Episodes ────────────────────────────────────────────────────────

    /// Upsert an episode keyed on uuid.
    pub async fn save_episode(&self, episode: &EpisodicNode) -> Result<()> {
        let q = query(
            "MERGE (n:Episodic {uuid: $uuid})
             SET n.name = $name,
                 n.group_id = $group_id,
                 n.source = $source,
                 n.source_description = $source_description,
                 n.content = $content,
                 n.created_at = $created_at,
                 n.valid_at = $valid_at,
                 n.entity_edges = $entity_edges",
        )
        .param("uuid", episode.uuid.to_string())
        .param("name", episode.name.as_str())
        .param("group_id", episode.group_id.as_str())
        .param("source", episode.source.as_str())
        .param("source_description", episode.source_description.as_str())
        .param("content", episode.content.as_str())
        .param("created_at", format_neo4j_datetime(&episode.created_at))
        .param("valid_at", format_neo4j_datetime(&episode.valid_at))
        .param("entity_edges", episode.entity_edges.clone());

        self.graph.run(q).await.map_err(driver_err)
    }

    /// The most recent `last_n` episodes in `group_id` with
    /// `valid_at <= reference_time`, in chronological order.
    pub async fn recent_episodes(
        &self,
        group_id: &str,
        reference_time: &DateTime<Utc>,
        last_n: usize,
    ) -> Result<Vec<EpisodicNode>> {
        let q = query(
            "MATCH (n:Episodic)
             WHERE n.group_id = $group_id AND n.valid_at <= $reference_time
             RETURN n.uuid AS uuid, n.name AS name, n.group_id AS group_id,
                    n.source AS source, n.source_description AS source_description,
                    n.content AS content, n.created_at AS created_at,
                    n.valid_at AS valid_at, n.entity_edges AS entity_edges
             ORDER BY n.valid_at DESC
             LIMIT $limit",
        )
        .param("group_id", group_id)
        .param("reference_time", format_neo4j_datetime(reference_time))
        .param("limit", last_n as i64);

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        let mut episodes = Vec::new();
        while let Some(row) = rows.next().await.map_err(driver_err)? {
            episodes.push(row_episode(&row)?);
        }
        // Query returns newest first; callers want oldest first.
        episodes.reverse();
        Ok(episodes)
    }

    /// Delete an episode and its relationships. Errors with
    /// [`GraphitiError::NodeNotFound`] when no such episode exists.
    pub async fn delete_episode(&self, uuid: &Uuid) -> Result<()> {
        let q = query(
            "MATCH (n:Episodic {uuid: $uuid})
             WITH n, n.uuid AS found
             DETACH DELETE n
             RETURN found",
        )
        .param("uuid", uuid.to_string());

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        match rows.next().await.map_err(driver_err)? {
            Some(_) => Ok(()),
            None => Err(GraphitiError::NodeNotFound(uuid.to_string())),
        }
    }

    // ── Entities and edges ──────────────────────────────────────────────

    /// Upsert an entity, deduplicating on `(name, group_id)`.
    ///
    /// Returns the canonical uuid: the stored one when an entity with this
    /// name already existed in the group, otherwise the uuid of `node`.
    pub async fn save_entity(&self, node: &EntityNode) -> Result<Uuid> {
        let q = query(
            "MERGE (n:Entity {name: $name, group_id: $group_id})
             ON CREATE SET n.uuid = $uuid, n.created_at = $created_at
             SET n.labels = $labels,
                 n.summary = CASE WHEN $summary <> ''
                             THEN $summary ELSE coalesce(n.summary, '') END,
                 n.name_embedding = CASE WHEN size($name_embedding) > 0
                                    THEN $name_embedding
                                    ELSE coalesce(n.name_embedding, []) END
             RETURN n.uuid AS uuid",
        )
        .param("name", node.name.as_str())
        .param("group_id", node.group_id.as_str())
        .param("uuid", node.uuid.to_string())
        .param("created_at", format_neo4j_datetime(&node.created_at))
        .param("labels", node.labels.clone())
        .param("summary", node.summary.as_str())
        .param("name_embedding", embedding_param(node.name_embedding.as_ref()));

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        match rows.next().await.map_err(driver_err)? {
            Some(row) => parse_uuid(&col::<String>(&row, "uuid")?),
            None => Err(GraphitiError::Driver(
                "entity upsert returned no row".to_string(),
            )),
        }
    }

    /// Upsert a RELATES_TO edge keyed on uuid. Both endpoints must already
    /// be saved.
    pub async fn save_entity_edge(&self, edge: &EntityEdge) -> Result<()> {
        let q = query(
            "MATCH (s:Entity {uuid: $source}), (t:Entity {uuid: $target})
             MERGE (s)-[e:RELATES_TO {uuid: $uuid}]->(t)
             SET e.group_id = $group_id,
                 e.name = $name,
                 e.fact = $fact,
                 e.fact_embedding = $fact_embedding,
                 e.episodes = $episodes,
                 e.created_at = $created_at,
                 e.expired_at = $expired_at,
                 e.valid_at = $valid_at,
                 e.invalid_at = $invalid_at",
        )
        .param("source", edge.source_node_uuid.to_string())
        .param("target", edge.target_node_uuid.to_string())
        .param("uuid", edge.uuid.to_string())
        .param("group_id", edge.group_id.as_str())
        .param("name", edge.name.as_str())
        .param("fact", edge.fact.as_str())
        .param("fact_embedding", embedding_param(edge.fact_embedding.as_ref()))
        .param("episodes", edge.episodes.clone())
        .param("created_at", format_neo4j_datetime(&edge.created_at))
        .param("expired_at", opt_timestamp(edge.expired_at.as_ref()))
        .param("valid_at", opt_timestamp(edge.valid_at.as_ref()))
        .param("invalid_at", opt_timestamp(edge.invalid_at.as_ref()));

        self.graph.run(q).await.map_err(driver_err)
    }

    /// Upsert a MENTIONS edge from an episode to an entity.
    pub async fn save_episodic_edge(&self, edge: &EpisodicEdge) -> Result<()> {
        let q = query(
            "MATCH (ep:Episodic {uuid: $source}), (en:Entity {uuid: $target})
             MERGE (ep)-[e:MENTIONS {uuid: $uuid}]->(en)
             SET e.group_id = $group_id, e.created_at = $created_at",
        )
        .param("source", edge.source_node_uuid.to_string())
        .param("target", edge.target_node_uuid.to_string())
        .param("uuid", edge.uuid.to_string())
        .param("group_id", edge.group_id.as_str())
        .param("created_at", format_neo4j_datetime(&edge.created_at));

        self.graph.run(q).await.map_err(driver_err)
    }

    pub async fn entity_edge_by_uuid(&self, uuid: &Uuid) -> Result<EntityEdge> {
        let q = query(
            "MATCH (s:Entity)-[e:RELATES_TO {uuid: $uuid}]->(t:Entity)
             RETURN e.uuid AS uuid, e.group_id AS group_id,
                    s.uuid AS source_node_uuid, t.uuid AS target_node_uuid,
                    e.name AS name, e.fact AS fact,
                    e.fact_embedding AS fact_embedding, e.episodes AS episodes,
                    e.created_at AS created_at, e.expired_at AS expired_at,
                    e.valid_at AS valid_at, e.invalid_at AS invalid_at",
        )
        .param("uuid", uuid.to_string());

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        match rows.next().await.map_err(driver_err)? {
            Some(row) => row_entity_edge(&row),
            None => Err(GraphitiError::EdgeNotFound(uuid.to_string())),
        }
    }

    /// Delete a RELATES_TO edge. Errors with [`GraphitiError::EdgeNotFound`]
    /// when no such edge exists.
    pub async fn delete_entity_edge(&self, uuid: &Uuid) -> Result<()> {
        let q = query(
            "MATCH ()-[e:RELATES_TO {uuid: $uuid}]->()
             WITH e, e.uuid AS found
             DELETE e
             RETURN found",
        )
        .param("uuid", uuid.to_string());

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        match rows.next().await.map_err(driver_err)? {
            Some(_) => Ok(()),
            None => Err(GraphitiError::EdgeNotFound(uuid.to_string())),
        }
    }

    // ── Full-text search ────────────────────────────────────────────────

    /// Keyword search over entity names and summaries, Lucene-score ordered.
    /// Semantic reranking happens in the search layer, not here.
    pub async fn search_nodes_fulltext(
        &self,
        query_text: &str,
        group_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredNode>> {
        let q = query(
            "CALL db.index.fulltext.queryNodes('node_name_and_summary', $query)
             YIELD node, score
             WHERE node.group_id IN $group_ids
             RETURN node.uuid AS uuid, node.name AS name,
                    node.group_id AS group_id, node.labels AS labels,
                    node.summary AS summary,
                    node.name_embedding AS name_embedding,
                    node.created_at AS created_at, score
             ORDER BY score DESC
             LIMIT $limit",
        )
        .param("query", query_text)
        .param("group_ids", group_ids.to_vec())
        .param("limit", limit as i64);

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(driver_err)? {
            out.push(row_scored_node(&row)?);
        }
        Ok(out)
    }

    /// Keyword search over relationship names and facts, Lucene-score ordered.
    pub async fn search_edges_fulltext(
        &self,
        query_text: &str,
        group_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredEdge>> {
        let q = query(
            "CALL db.index.fulltext.queryRelationships('edge_name_and_fact', $query)
             YIELD relationship, score
             WITH relationship AS e, score
             MATCH (s:Entity)-[e]->(t:Entity)
             WHERE e.group_id IN $group_ids
             RETURN e.uuid AS uuid, e.group_id AS group_id,
                    s.uuid AS source_node_uuid, t.uuid AS target_node_uuid,
                    e.name AS name, e.fact AS fact,
                    e.fact_embedding AS fact_embedding, e.episodes AS episodes,
                    e.created_at AS created_at, e.expired_at AS expired_at,
                    e.valid_at AS valid_at, e.invalid_at AS invalid_at, score
             ORDER BY score DESC
             LIMIT $limit",
        )
        .param("query", query_text)
        .param("group_ids", group_ids.to_vec())
        .param("limit", limit as i64);

        let mut rows = self.graph.execute(q).await.map_err(driver_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(driver_err)? {
            let edge = row_entity_edge(&row)?;
            out.push(ScoredEdge {
                edge,
                score: col(&row, "score")?,
            });
        }
        Ok(out)
    }
}

impl GraphDriver for Neo4jDriver {
    async fn ping(&self) -> Result<()> {
        let mut rows = self
            .graph
            .execute(query("RETURN 1 AS ok"))
            .await
            .map_err(|e| GraphitiError::Driver(format!("ping failed: {e}")))?;
        rows.next()
            .await
            .map_err(|e| GraphitiError::Driver(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // neo4rs tears down pooled connections when the Graph drops.
        debug!("neo4j driver closed");
        Ok(())
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────

fn col<T: serde::de::DeserializeOwned>(row: &Row, name: &str) -> Result<T> {
    row.get::<T>(name)
        .map_err(|e| GraphitiError::Driver(format!("column {name}: {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| GraphitiError::Driver(format!("invalid uuid {s}: {e}")))
}

fn required_ts(row: &Row, name: &str) -> Result<DateTime<Utc>> {
    let raw: String = col(row, name)?;
    parse_flexible_datetime(&raw)
        .ok_or_else(|| GraphitiError::Driver(format!("unparseable timestamp in {name}: {raw}")))
}

/// Optional timestamps are stored as empty strings when absent.
fn optional_ts(row: &Row, name: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = col(row, name)?;
    Ok(raw
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(parse_flexible_datetime))
}

/// Absent embeddings are stored as empty lists.
fn embedding_param(v: Option<&Vec<f32>>) -> Vec<f64> {
    v.map(|v| v.iter().map(|x| *x as f64).collect())
        .unwrap_or_default()
}

fn opt_timestamp(dt: Option<&DateTime<Utc>>) -> String {
    dt.map(format_neo4j_datetime).unwrap_or_default()
}

fn read_embedding(row: &Row, name: &str) -> Result<Option<Vec<f32>>> {
    let raw: Option<Vec<f64>> = col(row, name)?;
    Ok(raw
        .filter(|v| !v.is_empty())
        .map(|v| v.into_iter().map(|x| x as f32).collect()))
}

fn row_episode(row: &Row) -> Result<EpisodicNode> {
    let source: String = col(row, "source")?;
    Ok(EpisodicNode {
        uuid: parse_uuid(&col::<String>(row, "uuid")?)?,
        name: col(row, "name")?,
        group_id: col(row, "group_id")?,
        labels: vec!["Episodic".to_string()],
        created_at: required_ts(row, "created_at")?,
        source: EpisodeType::parse(&source),
        source_description: col(row, "source_description")?,
        content: col(row, "content")?,
        valid_at: required_ts(row, "valid_at")?,
        entity_edges: col(row, "entity_edges")?,
    })
}

fn row_scored_node(row: &Row) -> Result<ScoredNode> {
    let labels: Option<Vec<String>> = col(row, "labels")?;
    let summary: Option<String> = col(row, "summary")?;
    let node = EntityNode {
        uuid: parse_uuid(&col::<String>(row, "uuid")?)?,
        name: col(row, "name")?,
        group_id: col(row, "group_id")?,
        labels: labels.unwrap_or_else(|| vec!["Entity".to_string()]),
        summary: summary.unwrap_or_default(),
        name_embedding: read_embedding(row, "name_embedding")?,
        created_at: required_ts(row, "created_at")?,
    };
    Ok(ScoredNode {
        node,
        score: col(row, "score")?,
    })
}

fn row_entity_edge(row: &Row) -> Result<EntityEdge> {
    Ok(EntityEdge {
        uuid: parse_uuid(&col::<String>(row, "uuid")?)?,
        group_id: col(row, "group_id")?,
        source_node_uuid: parse_uuid(&col::<String>(row, "source_node_uuid")?)?,
        target_node_uuid: parse_uuid(&col::<String>(row, "target_node_uuid")?)?,
        name: col(row, "name")?,
        fact: col(row, "fact")?,
        fact_embedding: read_embedding(row, "fact_embedding")?,
        episodes: col(row, "episodes")?,
        created_at: required_ts(row, "created_at")?,
        expired_at: optional_ts(row, "expired_at")?,
        valid_at: optional_ts(row, "valid_at")?,
        invalid_at: optional_ts(row, "invalid_at")?,
    })
}
