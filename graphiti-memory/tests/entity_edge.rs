//! Integration tests for `EntityEdge` — bi-temporal factual relationship between EntityNodes.

use chrono::{TimeZone, Utc};
use graphiti_memory::edges::entity::EntityEdge;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a minimal valid `EntityEdge` between two fresh nodes.
fn minimal_edge() -> EntityEdge {
    EntityEdge::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "KNOWS",
        "Alice knows Bob",
        "default",
    )
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_entity_edge_construction_minimal() {
    let edge = minimal_edge();
    assert_eq!(edge.name, "KNOWS");
    assert_eq!(edge.fact, "Alice knows Bob");
    assert_eq!(edge.group_id, "default");
    assert!(edge.valid_at.is_none());
    assert!(edge.invalid_at.is_none());
    assert!(edge.expired_at.is_none());
    assert!(edge.fact_embedding.is_none());
    assert!(edge.episodes.is_empty());
}

#[test]
fn test_entity_edge_construction_full() {
    let source = Uuid::new_v4();
    let target = Uuid::new_v4();
    let episode = Uuid::new_v4();

    let edge = EntityEdge {
        source_node_uuid: source,
        target_node_uuid: target,
        name: "WORKS_AT".to_string(),
        fact: "Alice works at Acme Corp.".to_string(),
        fact_embedding: Some(vec![0.1_f32, 0.2, 0.3]),
        episodes: vec![episode.to_string()],
        valid_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        invalid_at: Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()),
        group_id: "org_acme".to_string(),
        ..minimal_edge()
    };

    assert_eq!(edge.source_node_uuid, source);
    assert_eq!(edge.target_node_uuid, target);
    assert!(edge.valid_at.is_some());
    assert!(edge.invalid_at.is_some());
    assert!(edge.fact_embedding.is_some());
    assert_eq!(edge.episodes, vec![episode.to_string()]);
    assert_eq!(edge.group_id, "org_acme");
}

// ---------------------------------------------------------------------------
// Bi-temporal semantics
// ---------------------------------------------------------------------------

#[test]
fn test_valid_at_precedes_invalid_at() {
    let valid_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let invalid_at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    let edge = EntityEdge {
        valid_at: Some(valid_at),
        invalid_at: Some(invalid_at),
        ..minimal_edge()
    };

    assert!(
        edge.valid_at.unwrap() < edge.invalid_at.unwrap(),
        "valid_at must precede invalid_at"
    );
}

#[test]
fn test_created_at_precedes_expired_at() {
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let expired_at = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

    let edge = EntityEdge {
        created_at,
        expired_at: Some(expired_at),
        ..minimal_edge()
    };

    assert!(
        edge.created_at < edge.expired_at.unwrap(),
        "created_at must precede expired_at"
    );
}

#[test]
fn test_currently_valid_edge() {
    // An edge is currently valid in the real world when:
    //   valid_at <= now AND invalid_at is None (or in the future)
    let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let edge = EntityEdge {
        valid_at: Some(past),
        invalid_at: None,
        ..minimal_edge()
    };

    let now = Utc::now();
    let is_currently_valid = edge.valid_at.map(|vt| vt <= now).unwrap_or(true)
        && edge.invalid_at.map(|ivt| ivt > now).unwrap_or(true);

    assert!(is_currently_valid);
}

#[test]
fn test_historically_invalidated_edge() {
    // An edge that was valid in the past but is now invalidated.
    let valid_at = Utc.with_ymd_and_hms(2010, 6, 1, 0, 0, 0).unwrap();
    let invalid_at = Utc.with_ymd_and_hms(2015, 6, 1, 0, 0, 0).unwrap();

    let edge = EntityEdge {
        valid_at: Some(valid_at),
        invalid_at: Some(invalid_at),
        ..minimal_edge()
    };

    let now = Utc::now();
    let is_currently_valid = edge.valid_at.map(|vt| vt <= now).unwrap_or(true)
        && edge.invalid_at.map(|ivt| ivt > now).unwrap_or(true);

    assert!(!is_currently_valid, "edge should be invalidated by now");
}

#[test]
fn test_graph_expired_edge() {
    // An edge that has been superseded in the graph (transaction-time expiry).
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let expired_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let edge = EntityEdge {
        created_at,
        expired_at: Some(expired_at),
        ..minimal_edge()
    };

    assert!(
        edge.expired_at.is_some(),
        "edge should be marked as expired in the graph"
    );
}

// ---------------------------------------------------------------------------
// Episode provenance
// ---------------------------------------------------------------------------

#[test]
fn test_episodes_empty_by_default() {
    let edge = minimal_edge();
    assert!(edge.episodes.is_empty());
}

#[test]
fn test_episodes_accumulate_in_order() {
    let first = Uuid::new_v4().to_string();
    let second = Uuid::new_v4().to_string();

    let mut edge = minimal_edge();
    edge.episodes.push(first.clone());
    edge.episodes.push(second.clone());

    assert_eq!(edge.episodes, vec![first, second]);
}

// ---------------------------------------------------------------------------
// Serialization / Deserialization
// ---------------------------------------------------------------------------

#[test]
fn test_entity_edge_serializes_to_json() {
    let edge = minimal_edge();
    let json_str = serde_json::to_string(&edge).expect("serialization must succeed");
    assert!(json_str.contains("\"name\""));
    assert!(json_str.contains("\"fact\""));
    assert!(json_str.contains("\"group_id\""));
    assert!(json_str.contains("\"episodes\""));
    assert!(json_str.contains("\"created_at\""));
}

#[test]
fn test_fact_embedding_never_serialized() {
    let edge = EntityEdge {
        fact_embedding: Some(vec![0.5_f32; 8]),
        ..minimal_edge()
    };

    let value = serde_json::to_value(&edge).expect("serialize");
    assert!(
        value.get("fact_embedding").is_none(),
        "fact_embedding must not appear in serialized output"
    );
}

#[test]
fn test_entity_edge_roundtrips_json() {
    let original = EntityEdge {
        name: "ROUNDTRIP".to_string(),
        fact: "A fact.".to_string(),
        fact_embedding: Some(vec![1.0_f32, 0.0]),
        episodes: vec![Uuid::new_v4().to_string()],
        valid_at: Some(Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap()),
        created_at: Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap(),
        group_id: "group_1".to_string(),
        ..minimal_edge()
    };

    let json_str = serde_json::to_string(&original).expect("serialize");
    let restored: EntityEdge = serde_json::from_str(&json_str).expect("deserialize");

    assert_eq!(restored.uuid, original.uuid);
    assert_eq!(restored.name, original.name);
    assert_eq!(restored.fact, original.fact);
    assert_eq!(restored.valid_at, original.valid_at);
    assert_eq!(restored.episodes, original.episodes);
    assert_eq!(restored.group_id, original.group_id);
    // The embedding never crosses the serialization boundary.
    assert!(restored.fact_embedding.is_none());
}

#[test]
fn test_entity_edge_deserializes_null_optionals() {
    let json_str = r#"{
        "uuid": "00000000-0000-0000-0000-000000000001",
        "source_node_uuid": "00000000-0000-0000-0000-000000000002",
        "target_node_uuid": "00000000-0000-0000-0000-000000000003",
        "name": "KNOWS",
        "fact": "A knows B",
        "episodes": [],
        "valid_at": null,
        "invalid_at": null,
        "created_at": "2024-01-01T00:00:00Z",
        "expired_at": null,
        "group_id": "default"
    }"#;

    let edge: EntityEdge = serde_json::from_str(json_str).expect("deserialize");
    assert!(edge.valid_at.is_none());
    assert!(edge.invalid_at.is_none());
    assert!(edge.expired_at.is_none());
    assert!(edge.fact_embedding.is_none());
    assert_eq!(edge.group_id, "default");
}

// ---------------------------------------------------------------------------
// UUID identity
// ---------------------------------------------------------------------------

#[test]
fn test_entity_edge_has_unique_uuid() {
    let e1 = minimal_edge();
    let e2 = minimal_edge();
    assert_ne!(e1.uuid, e2.uuid, "each edge must have a unique UUID");
}

#[test]
fn test_source_and_target_are_distinct_fields() {
    let source = Uuid::new_v4();
    let target = Uuid::new_v4();

    let edge = EntityEdge {
        source_node_uuid: source,
        target_node_uuid: target,
        ..minimal_edge()
    };

    assert_ne!(edge.source_node_uuid, edge.target_node_uuid);
    assert_eq!(edge.source_node_uuid, source);
    assert_eq!(edge.target_node_uuid, target);
}
