//! Hybrid search: full-text retrieval fused with semantic similarity.
//!
//! Retrieval happens in the driver (Lucene full-text indices). This module
//! owns the pure parts: query preprocessing, cosine ranking of candidates
//! against the query embedding, and reciprocal rank fusion (RRF) of the two
//! orderings. Keeping the fusion pure makes it directly testable without a
//! database.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::edges::EntityEdge;
use crate::nodes::EntityNode;
use crate::utils::{cosine_similarity, lucene_sanitize, normalize_whitespace};

/// How many full-text candidates to fetch per requested result, so the
/// semantic rerank has something to work with.
pub const OVERFETCH_FACTOR: usize = 2;

/// RRF dampening constant. Rank `i` (0-based) contributes `1 / (i + 1)`.
const RANK_CONST: f64 = 1.0;

/// A full-text node candidate with its Lucene relevance score.
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node: EntityNode,
    pub score: f64,
}

/// A full-text edge candidate with its Lucene relevance score.
#[derive(Debug, Clone)]
pub struct ScoredEdge {
    pub edge: EntityEdge,
    pub score: f64,
}

/// Wire-facing projection of an entity node in search results.
#[derive(Debug, Clone, Serialize)]
pub struct NodeResult {
    pub uuid: Uuid,
    pub name: String,
    pub summary: String,
    pub labels: Vec<String>,
    pub group_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<EntityNode> for NodeResult {
    fn from(node: EntityNode) -> Self {
        Self {
            uuid: node.uuid,
            name: node.name,
            summary: node.summary,
            labels: node.labels,
            group_id: node.group_id,
            created_at: node.created_at,
        }
    }
}

/// Normalize and Lucene-escape a raw query string.
///
/// Returns `None` when nothing searchable remains (empty or whitespace-only
/// input), which callers treat as an empty result set rather than an error.
pub fn preprocess_query(raw: &str) -> Option<String> {
    let normalized = normalize_whitespace(raw);
    if normalized.is_empty() {
        return None;
    }
    Some(lucene_sanitize(&normalized))
}

/// Fuse full-text order with semantic order and keep the best `limit` nodes.
///
/// `candidates` must be in full-text relevance order. When a query embedding
/// is present, a second ranking by cosine similarity of `name_embedding` is
/// fused via RRF; candidates without a stored embedding sink to the bottom
/// of that ranking. Without an embedding the full-text order stands.
pub fn rerank_nodes(
    candidates: Vec<ScoredNode>,
    query_embedding: Option<&[f32]>,
    limit: usize,
) -> Vec<EntityNode> {
    let mut rankings = vec![candidates.iter().map(|c| c.node.uuid).collect::<Vec<_>>()];
    if let Some(qe) = query_embedding {
        rankings.push(semantic_rank(
            candidates
                .iter()
                .map(|c| (c.node.uuid, c.node.name_embedding.as_deref())),
            qe,
        ));
    }

    let scores = rrf_scores(&rankings);
    let nodes = candidates.into_iter().map(|c| c.node).collect();
    order_by_scores(nodes, |n: &EntityNode| n.uuid, &scores, limit)
}

/// Edge counterpart of [`rerank_nodes`], ranking on `fact_embedding`.
pub fn rerank_edges(
    candidates: Vec<ScoredEdge>,
    query_embedding: Option<&[f32]>,
    limit: usize,
) -> Vec<EntityEdge> {
    let mut rankings = vec![candidates.iter().map(|c| c.edge.uuid).collect::<Vec<_>>()];
    if let Some(qe) = query_embedding {
        rankings.push(semantic_rank(
            candidates
                .iter()
                .map(|c| (c.edge.uuid, c.edge.fact_embedding.as_deref())),
            qe,
        ));
    }

    let scores = rrf_scores(&rankings);
    let edges = candidates.into_iter().map(|c| c.edge).collect();
    order_by_scores(edges, |e: &EntityEdge| e.uuid, &scores, limit)
}

/// Reciprocal rank fusion over one or more uuid rankings.
fn rrf_scores(rankings: &[Vec<Uuid>]) -> HashMap<Uuid, f64> {
    let mut scores: HashMap<Uuid, f64> = HashMap::new();
    for ranking in rankings {
        for (i, uuid) in ranking.iter().enumerate() {
            *scores.entry(*uuid).or_default() += 1.0 / (i as f64 + RANK_CONST);
        }
    }
    scores
}

/// Order uuids by cosine similarity to the query embedding, descending.
/// Items without an embedding rank below every item that has one; ties keep
/// input order.
fn semantic_rank<'a>(
    items: impl Iterator<Item = (Uuid, Option<&'a [f32]>)>,
    query_embedding: &[f32],
) -> Vec<Uuid> {
    let mut scored: Vec<(usize, Uuid, f32)> = items
        .enumerate()
        .map(|(i, (uuid, embedding))| {
            let sim = embedding
                .map(|e| cosine_similarity(query_embedding, e))
                .unwrap_or(f32::NEG_INFINITY);
            (i, uuid, sim)
        })
        .collect();
    scored.sort_by(|(ia, _, sa), (ib, _, sb)| {
        sb.partial_cmp(sa).unwrap_or(Ordering::Equal).then(ia.cmp(ib))
    });
    scored.into_iter().map(|(_, uuid, _)| uuid).collect()
}

/// Sort items by fused score descending, input order breaking ties, and
/// truncate to `limit`.
fn order_by_scores<T>(
    items: Vec<T>,
    key: impl Fn(&T) -> Uuid,
    scores: &HashMap<Uuid, f64>,
    limit: usize,
) -> Vec<T> {
    let mut indexed: Vec<(usize, T)> = items.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        let sa = scores.get(&key(a)).copied().unwrap_or(0.0);
        let sb = scores.get(&key(b)).copied().unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then(ia.cmp(ib))
    });
    indexed.into_iter().map(|(_, t)| t).take(limit).collect()
}
