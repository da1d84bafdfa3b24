//! Tool registry and handlers.
//!
//! Tool results are application-level JSON objects; the request loop wraps
//! them in the protocol's text-content envelope. Handler failures of any
//! kind (bad arguments, store errors) become `{"error": ..., "tool": ...}`
//! objects rather than protocol faults, so clients always see a well-formed
//! `tools/call` result.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use graphiti_memory::{EpisodeType, GraphitiConfig, NewEpisode};

use crate::bootstrap::{AppContext, GraphServices};
use crate::queue::GroupQueues;
use std::sync::Arc;

pub const TOOL_NAMES: [&str; 8] = [
    "add_memory",
    "search_memory_nodes",
    "search_memory_facts",
    "get_episodes",
    "delete_episode",
    "delete_entity_edge",
    "get_entity_edge",
    "clear_graph",
];

// ─── Tool declarations ────────────────────────────────────────────────────────

/// The schema objects served by `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "add_memory",
            "description": "Add an episode/memory to the knowledge graph. This is the primary way to add information.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the episode"
                    },
                    "episode_body": {
                        "type": "string",
                        "description": "Content of the episode (text, message, or JSON)"
                    },
                    "group_id": {
                        "type": "string",
                        "description": "Optional group ID for organizing data"
                    },
                    "source": {
                        "type": "string",
                        "enum": ["text", "message", "json"],
                        "description": "Source type (default: text)"
                    },
                    "source_description": {
                        "type": "string",
                        "description": "Optional description of the source"
                    }
                },
                "required": ["name", "episode_body"]
            }
        },
        {
            "name": "search_memory_nodes",
            "description": "Search for nodes (entities) in the knowledge graph",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "group_ids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Optional list of group IDs to filter results"
                    },
                    "max_nodes": {
                        "type": "integer",
                        "description": "Maximum number of nodes to return (default: 10)"
                    }
                },
                "required": ["query"]
            }
        },
        {
            "name": "search_memory_facts",
            "description": "Search for facts (relationships) in the knowledge graph",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "group_ids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Optional list of group IDs to filter results"
                    },
                    "max_facts": {
                        "type": "integer",
                        "description": "Maximum number of facts to return (default: 10)"
                    }
                },
                "required": ["query"]
            }
        },
        {
            "name": "get_episodes",
            "description": "Get recent episodes for a group",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "group_id": {
                        "type": "string",
                        "description": "Group ID to retrieve episodes from"
                    },
                    "last_n": {
                        "type": "integer",
                        "description": "Number of recent episodes to retrieve (default: 10)"
                    }
                },
                "required": []
            }
        },
        {
            "name": "delete_episode",
            "description": "Delete an episode from the knowledge graph",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "uuid": {
                        "type": "string",
                        "description": "UUID of the episode to delete"
                    }
                },
                "required": ["uuid"]
            }
        },
        {
            "name": "delete_entity_edge",
            "description": "Delete an entity edge (fact) from the knowledge graph",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "uuid": {
                        "type": "string",
                        "description": "UUID of the entity edge to delete"
                    }
                },
                "required": ["uuid"]
            }
        },
        {
            "name": "get_entity_edge",
            "description": "Get an entity edge by UUID",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "uuid": {
                        "type": "string",
                        "description": "UUID of the entity edge to retrieve"
                    }
                },
                "required": ["uuid"]
            }
        },
        {
            "name": "clear_graph",
            "description": "Clear all data from the knowledge graph (DESTRUCTIVE)",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }
    ])
}

// ─── Parameter types ──────────────────────────────────────────────────────────

// Defaults mirror the declared schemas; missing optional fields never fail
// parsing, and absent strings fall back to empty like lenient clients expect.

#[derive(Debug, Deserialize)]
struct AddMemoryParams {
    #[serde(default)]
    name: String,
    #[serde(default)]
    episode_body: String,
    group_id: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    source_description: String,
}

#[derive(Debug, Deserialize)]
struct SearchNodesParams {
    #[serde(default)]
    query: String,
    group_ids: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    max_nodes: usize,
}

#[derive(Debug, Deserialize)]
struct SearchFactsParams {
    #[serde(default)]
    query: String,
    group_ids: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    max_facts: usize,
}

#[derive(Debug, Deserialize)]
struct GetEpisodesParams {
    group_id: Option<String>,
    #[serde(default = "default_limit")]
    last_n: usize,
}

#[derive(Debug, Deserialize)]
struct UuidParams {
    #[serde(default)]
    uuid: String,
}

fn default_limit() -> usize {
    10
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

/// Route a `tools/call` to its handler and return the application-level
/// result object.
///
/// Unknown tool names are reported regardless of connection state; known
/// tools on a disconnected server all cite the stored startup diagnostic.
pub async fn dispatch(ctx: &AppContext, name: &str, arguments: Value) -> Value {
    if !TOOL_NAMES.contains(&name) {
        return json!({ "error": format!("Unknown tool: {name}") });
    }

    let Some(services) = ctx.services() else {
        let error = ctx.status().error().unwrap_or("not initialized");
        return json!({
            "error": format!("Graphiti not connected: {error}"),
            "solution": "Check Neo4j connection and credentials",
        });
    };

    debug!(tool = name, "dispatching tool call");
    match name {
        "add_memory" => add_memory(ctx.config(), &services.queues, arguments).await,
        "search_memory_nodes" => search_nodes(ctx.config(), services, arguments).await,
        "search_memory_facts" => search_facts(ctx.config(), services, arguments).await,
        "get_episodes" => get_episodes(ctx.config(), services, arguments).await,
        "delete_episode" => delete_episode(services, arguments).await,
        "delete_entity_edge" => delete_entity_edge(services, arguments).await,
        "get_entity_edge" => get_entity_edge(services, arguments).await,
        "clear_graph" => clear_graph(services).await,
        other => json!({ "error": format!("Unknown tool: {other}") }),
    }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

/// Queue an episode for ingestion and acknowledge immediately; the caller
/// never waits for extraction. The reference time is captured here, at
/// enqueue, so episode ordering reflects submission order even when the
/// queue is deep.
async fn add_memory(config: &GraphitiConfig, queues: &Arc<GroupQueues>, args: Value) -> Value {
    let p: AddMemoryParams = match parse_args("add_memory", args) {
        Ok(p) => p,
        Err(e) => return e,
    };

    let episode = NewEpisode {
        name: p.name.clone(),
        body: p.episode_body,
        source: EpisodeType::parse(&p.source),
        source_description: p.source_description,
        group_id: p.group_id.unwrap_or_else(|| config.group_id.clone()),
        reference_time: Utc::now(),
    };
    let queue_position = queues.enqueue(episode);

    json!({
        "success": true,
        "message": format!("Episode '{}' queued for processing", p.name),
        "queue_position": queue_position,
    })
}

async fn search_nodes(config: &GraphitiConfig, services: &GraphServices, args: Value) -> Value {
    let p: SearchNodesParams = match parse_args("search_memory_nodes", args) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let group_ids = p
        .group_ids
        .unwrap_or_else(|| vec![config.group_id.clone()]);

    match services.client.search_nodes(&p.query, &group_ids, p.max_nodes).await {
        Ok(nodes) => {
            let total = nodes.len();
            json!({ "query": p.query, "nodes": nodes, "total": total, "success": true })
        }
        Err(e) => tool_error("search_memory_nodes", e),
    }
}

async fn search_facts(config: &GraphitiConfig, services: &GraphServices, args: Value) -> Value {
    let p: SearchFactsParams = match parse_args("search_memory_facts", args) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let group_ids = p
        .group_ids
        .unwrap_or_else(|| vec![config.group_id.clone()]);

    match services.client.search_facts(&p.query, &group_ids, p.max_facts).await {
        Ok(facts) => {
            let total = facts.len();
            json!({ "query": p.query, "facts": facts, "total": total, "success": true })
        }
        Err(e) => tool_error("search_memory_facts", e),
    }
}

async fn get_episodes(config: &GraphitiConfig, services: &GraphServices, args: Value) -> Value {
    let p: GetEpisodesParams = match parse_args("get_episodes", args) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let group_id = p.group_id.unwrap_or_else(|| config.group_id.clone());

    match services
        .client
        .retrieve_episodes(&group_id, &Utc::now(), p.last_n)
        .await
    {
        Ok(episodes) => {
            let total = episodes.len();
            json!({ "group_id": group_id, "episodes": episodes, "total": total, "success": true })
        }
        Err(e) => tool_error("get_episodes", e),
    }
}

async fn delete_episode(services: &GraphServices, args: Value) -> Value {
    let (raw, uuid) = match uuid_arg("delete_episode", args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };

    match services.client.delete_episode(&uuid).await {
        Ok(()) => json!({
            "success": true,
            "message": format!("Episode with UUID {raw} deleted successfully"),
        }),
        Err(e) => tool_error("delete_episode", e),
    }
}

async fn delete_entity_edge(services: &GraphServices, args: Value) -> Value {
    let (raw, uuid) = match uuid_arg("delete_entity_edge", args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };

    match services.client.delete_entity_edge(&uuid).await {
        Ok(()) => json!({
            "success": true,
            "message": format!("Entity edge with UUID {raw} deleted successfully"),
        }),
        Err(e) => tool_error("delete_entity_edge", e),
    }
}

async fn get_entity_edge(services: &GraphServices, args: Value) -> Value {
    let (_, uuid) = match uuid_arg("get_entity_edge", args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };

    match services.client.entity_edge(&uuid).await {
        Ok(edge) => json!({ "success": true, "edge": edge }),
        Err(e) => tool_error("get_entity_edge", e),
    }
}

async fn clear_graph(services: &GraphServices) -> Value {
    match services.client.clear().await {
        Ok(()) => json!({
            "success": true,
            "message": "Graph cleared successfully and indices rebuilt",
        }),
        Err(e) => tool_error("clear_graph", e),
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn tool_error(tool: &str, error: impl std::fmt::Display) -> Value {
    json!({ "error": error.to_string(), "tool": tool })
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, Value> {
    serde_json::from_value(args).map_err(|e| tool_error(tool, format!("invalid arguments: {e}")))
}

/// Parse the `uuid` argument, keeping the raw string for echo in messages.
fn uuid_arg(tool: &str, args: Value) -> Result<(String, Uuid), Value> {
    let p: UuidParams = parse_args(tool, args)?;
    let uuid = Uuid::parse_str(&p.uuid)
        .map_err(|e| tool_error(tool, format!("invalid uuid '{}': {e}", p.uuid)))?;
    Ok((p.uuid, uuid))
}
