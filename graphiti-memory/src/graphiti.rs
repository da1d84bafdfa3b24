//! Graphiti — the temporally-aware knowledge graph client.
//!
//! Ties the pieces together: the Neo4j driver for persistence, the optional
//! extraction client for turning episode text into entities and facts, and
//! the optional embedder powering the semantic half of hybrid search.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GraphitiConfig;
use crate::driver::{GraphDriver, Neo4jDriver};
use crate::edges::{EntityEdge, EpisodicEdge};
use crate::embedder::{openai::OpenAiEmbedder, EmbedderClient, Embedding};
use crate::errors::Result;
use crate::extraction::{
    openai::{CacheConfig, OpenAiExtractor},
    EpisodeContext, ExtractionClient,
};
use crate::nodes::{EntityNode, EpisodeType, EpisodicNode};
use crate::search::{preprocess_query, rerank_edges, rerank_nodes, NodeResult, OVERFETCH_FACTOR};

/// How many earlier episodes accompany an episode into the extraction prompt.
const PREVIOUS_EPISODE_WINDOW: usize = 3;

/// An episode submitted for ingestion.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub name: String,
    pub body: String,
    pub source: EpisodeType,
    pub source_description: String,
    pub group_id: String,
    /// When the episode was submitted. Becomes `valid_at` on the stored
    /// node, so ordering reflects submission time even when processing lags.
    pub reference_time: DateTime<Utc>,
}

/// Temporally-aware knowledge graph client over Neo4j.
///
/// Extraction and embedding are optional: without an OpenAI API key the
/// graph still ingests raw episodes and serves keyword search.
pub struct Graphiti {
    driver: Neo4jDriver,
    extractor: Option<OpenAiExtractor>,
    embedder: Option<OpenAiEmbedder>,
    config: GraphitiConfig,
}

impl Graphiti {
    /// Validate the configuration, open the graph connection, and round-trip
    /// the database once.
    pub async fn connect(config: GraphitiConfig) -> Result<Self> {
        config.check()?;

        let driver = Neo4jDriver::connect(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
        )
        .await?;
        driver.ping().await?;

        let (extractor, embedder) = match &config.openai_api_key {
            Some(key) => {
                info!(model = %config.model_name, "entity extraction enabled");
                (
                    Some(OpenAiExtractor::new(
                        key,
                        &config.model_name,
                        CacheConfig::default(),
                    )),
                    Some(OpenAiEmbedder::new(key, &config.embedding_model)),
                )
            }
            None => {
                info!("no OpenAI API key configured, storing episodes without extraction");
                (None, None)
            }
        };

        Ok(Self {
            driver,
            extractor,
            embedder,
            config,
        })
    }

    pub fn config(&self) -> &GraphitiConfig {
        &self.config
    }

    pub fn extraction_enabled(&self) -> bool {
        self.extractor.is_some()
    }

    /// Create all graph indices. Run once at startup; idempotent.
    pub async fn build_indices_and_constraints(&self) -> Result<()> {
        self.driver.build_indices_and_constraints().await
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    /// Ingest one episode: persist it, then extract entities and facts into
    /// the graph when extraction is configured.
    ///
    /// The raw episode is durable before extraction starts, so enrichment
    /// failures (model outages, malformed output) leave a stored episode
    /// without entities rather than losing the submission.
    pub async fn add_episode(&self, episode: NewEpisode) -> Result<Uuid> {
        let mut node = EpisodicNode::new(
            episode.name,
            episode.group_id,
            episode.source,
            episode.source_description,
            episode.body,
            episode.reference_time,
        );
        self.driver.save_episode(&node).await?;
        debug!(episode_uuid = %node.uuid, group_id = %node.group_id, "episode stored");

        if let Some(extractor) = &self.extractor {
            if let Err(e) = self.enrich_episode(extractor, &mut node).await {
                warn!(
                    error = %e,
                    episode_uuid = %node.uuid,
                    "semantic enrichment failed, episode kept without entities"
                );
            }
        }

        Ok(node.uuid)
    }

    /// Extract entities and facts for a stored episode and wire them into
    /// the graph.
    async fn enrich_episode(
        &self,
        extractor: &OpenAiExtractor,
        episode: &mut EpisodicNode,
    ) -> Result<()> {
        let mut previous = self
            .driver
            .recent_episodes(&episode.group_id, &episode.valid_at, PREVIOUS_EPISODE_WINDOW)
            .await?;
        // The episode itself is already stored and sorts into the window.
        previous.retain(|p| p.uuid != episode.uuid);

        let context = EpisodeContext {
            name: &episode.name,
            content: &episode.content,
            source: episode.source,
            source_description: &episode.source_description,
            previous_episodes: &previous,
        };
        let graph = extractor.extract(&context).await?;
        if graph.is_empty() {
            debug!(episode_uuid = %episode.uuid, "extraction found no entities");
            return Ok(());
        }

        let name_embeddings = self
            .embed_all(graph.entities.iter().map(|e| e.name.as_str()))
            .await?;
        let fact_embeddings = self
            .embed_all(graph.relations.iter().map(|r| r.fact.as_str()))
            .await?;

        // Upsert entities; the driver returns the canonical uuid when an
        // entity with the same name already exists in the group.
        let mut canonical: HashMap<String, Uuid> = HashMap::new();
        for (extracted, embedding) in graph.entities.iter().zip(name_embeddings) {
            let mut entity =
                EntityNode::new(&extracted.name, &episode.group_id, &extracted.summary);
            if !extracted.entity_type.is_empty() && extracted.entity_type != "Entity" {
                entity.labels.push(extracted.entity_type.clone());
            }
            entity.name_embedding = embedding;
            let uuid = self.driver.save_entity(&entity).await?;
            canonical.insert(extracted.name.clone(), uuid);
        }

        for uuid in canonical.values() {
            let mention = EpisodicEdge::new(episode.uuid, *uuid, &episode.group_id);
            self.driver.save_episodic_edge(&mention).await?;
        }

        let mut edge_uuids = Vec::new();
        for (relation, embedding) in graph.relations.iter().zip(fact_embeddings) {
            let (Some(source), Some(target)) = (
                canonical.get(&relation.source_entity),
                canonical.get(&relation.target_entity),
            ) else {
                warn!(
                    source = %relation.source_entity,
                    target = %relation.target_entity,
                    "relation references an entity that was not extracted, skipping"
                );
                continue;
            };
            let mut edge = EntityEdge::new(
                *source,
                *target,
                &relation.relation,
                &relation.fact,
                &episode.group_id,
            );
            edge.fact_embedding = embedding;
            edge.valid_at = Some(episode.valid_at);
            edge.episodes.push(episode.uuid.to_string());
            self.driver.save_entity_edge(&edge).await?;
            edge_uuids.push(edge.uuid.to_string());
        }

        if !edge_uuids.is_empty() {
            episode.entity_edges = edge_uuids;
            self.driver.save_episode(episode).await?;
        }

        info!(
            episode_uuid = %episode.uuid,
            entities = canonical.len(),
            facts = episode.entity_edges.len(),
            "episode enriched"
        );
        Ok(())
    }

    async fn embed_all<'a>(
        &self,
        texts: impl Iterator<Item = &'a str>,
    ) -> Result<Vec<Option<Embedding>>> {
        let texts: Vec<&str> = texts.collect();
        match &self.embedder {
            Some(embedder) if !texts.is_empty() => {
                let embeddings = embedder.embed_batch(&texts).await?;
                Ok(embeddings.into_iter().map(Some).collect())
            }
            _ => Ok(vec![None; texts.len()]),
        }
    }

    // ── Search and retrieval ────────────────────────────────────────────

    /// Hybrid search over entity nodes. Returns at most `limit` results.
    pub async fn search_nodes(
        &self,
        query: &str,
        group_ids: &[String],
        limit: usize,
    ) -> Result<Vec<NodeResult>> {
        let Some(fulltext_query) = preprocess_query(query) else {
            return Ok(Vec::new());
        };

        let candidates = self
            .driver
            .search_nodes_fulltext(&fulltext_query, group_ids, limit * OVERFETCH_FACTOR)
            .await?;
        let query_embedding = self.query_embedding(query).await;
        let nodes = rerank_nodes(candidates, query_embedding.as_deref(), limit);
        Ok(nodes.into_iter().map(NodeResult::from).collect())
    }

    /// Hybrid search over facts (entity edges). Returns at most `limit`
    /// results.
    pub async fn search_facts(
        &self,
        query: &str,
        group_ids: &[String],
        limit: usize,
    ) -> Result<Vec<EntityEdge>> {
        let Some(fulltext_query) = preprocess_query(query) else {
            return Ok(Vec::new());
        };

        let candidates = self
            .driver
            .search_edges_fulltext(&fulltext_query, group_ids, limit * OVERFETCH_FACTOR)
            .await?;
        let query_embedding = self.query_embedding(query).await;
        Ok(rerank_edges(candidates, query_embedding.as_deref(), limit))
    }

    /// Embed the raw query text. Failures degrade to keyword-only ranking.
    async fn query_embedding(&self, query: &str) -> Option<Embedding> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(query).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(error = %e, "query embedding failed, falling back to keyword ranking");
                None
            }
        }
    }

    /// The most recent `last_n` episodes in a group as of `reference_time`,
    /// oldest first.
    pub async fn retrieve_episodes(
        &self,
        group_id: &str,
        reference_time: &DateTime<Utc>,
        last_n: usize,
    ) -> Result<Vec<EpisodicNode>> {
        self.driver
            .recent_episodes(group_id, reference_time, last_n)
            .await
    }

    // ── Point lookups and deletion ──────────────────────────────────────

    pub async fn entity_edge(&self, uuid: &Uuid) -> Result<EntityEdge> {
        self.driver.entity_edge_by_uuid(uuid).await
    }

    pub async fn delete_entity_edge(&self, uuid: &Uuid) -> Result<()> {
        self.driver.delete_entity_edge(uuid).await
    }

    pub async fn delete_episode(&self, uuid: &Uuid) -> Result<()> {
        self.driver.delete_episode(uuid).await
    }

    /// Wipe the graph and rebuild all indices.
    pub async fn clear(&self) -> Result<()> {
        self.driver.clear_data().await?;
        self.driver.build_indices_and_constraints().await
    }

    pub async fn close(&self) -> Result<()> {
        self.driver.close().await
    }
}
