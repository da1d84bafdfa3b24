//! Shared utilities.
//!
//! Includes:
//! - Date/time helpers (bi-temporal timestamp formatting for Cypher)
//! - Text helpers (whitespace normalization, Lucene escaping, log truncation)
//! - Vector similarity (cosine, L2 normalization)

pub mod datetime;
pub mod similarity;
pub mod text;

pub use datetime::{format_neo4j_datetime, parse_flexible_datetime};
pub use similarity::{cosine_similarity, normalize_l2};
pub use text::{
    extract_json_from_response, lucene_sanitize, normalize_whitespace, truncate_with_ellipsis,
};
