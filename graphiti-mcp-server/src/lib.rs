//! MCP server exposing graphiti-memory over newline-delimited JSON-RPC
//! on stdio.
//!
//! The binary wires [`bootstrap::AppContext`] (connection state and
//! services) into [`server::McpServer`] (the request loop). Episode
//! writes flow through [`queue::GroupQueues`], which serializes work
//! per group while keeping distinct groups fully parallel.

pub mod bootstrap;
pub mod protocol;
pub mod queue;
pub mod server;
pub mod tools;
