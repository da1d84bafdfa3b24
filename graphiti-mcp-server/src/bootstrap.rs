//! Startup wiring: connect to the graph store once, capture the outcome as
//! a process-wide status, and assemble the services handlers use.
//!
//! A failed connection is a reportable condition, not a fatal error. The
//! server always comes up and answers protocol requests; handlers surface
//! the stored diagnostic until the operator fixes the store and restarts.

use std::sync::Arc;

use tracing::{error, info, warn};

use graphiti_memory::{Graphiti, GraphitiConfig};

use crate::queue::{GraphitiIngestor, GroupQueues, SHUTDOWN_GRACE};

/// Connection state decided once at startup.
#[derive(Debug, Clone)]
pub enum ConnectionStatus {
    /// Graph store reachable; handlers may perform operations.
    Connected,
    /// Startup connect failed; every handler cites the stored error.
    Disconnected { error: String },
    /// Startup has not run. Reported as disconnected with no stored error.
    Uninitialized,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            _ => "disconnected",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ConnectionStatus::Disconnected { error } => Some(error),
            _ => None,
        }
    }
}

/// Everything a connected handler needs.
pub struct GraphServices {
    pub client: Arc<Graphiti>,
    pub queues: Arc<GroupQueues>,
}

/// Process-scoped context threaded through the request loop and handlers.
pub struct AppContext {
    config: GraphitiConfig,
    status: ConnectionStatus,
    graph: Option<GraphServices>,
}

impl AppContext {
    /// Connect to the graph store and build the service set.
    ///
    /// Never fails: a connection problem becomes `Disconnected` status with
    /// diagnostics logged, and the context comes up without services.
    pub async fn initialize(config: GraphitiConfig) -> Self {
        info!(
            uri = %config.neo4j_uri,
            user = %config.neo4j_user,
            extraction = config.extraction_enabled(),
            "initializing knowledge graph client"
        );

        match Self::connect(&config).await {
            Ok(client) => {
                info!("knowledge graph client initialized");
                let client = Arc::new(client);
                let ingestor = Arc::new(GraphitiIngestor::new(client.clone()));
                let queues = Arc::new(GroupQueues::new(ingestor));
                Self {
                    config,
                    status: ConnectionStatus::Connected,
                    graph: Some(GraphServices { client, queues }),
                }
            }
            Err(e) => {
                let error = e.to_string();
                error!(error = %error, "knowledge graph initialization failed");
                diagnose(&error);
                Self {
                    config,
                    status: ConnectionStatus::Disconnected { error },
                    graph: None,
                }
            }
        }
    }

    async fn connect(config: &GraphitiConfig) -> graphiti_memory::Result<Graphiti> {
        let client = Graphiti::connect(config.clone()).await?;
        client.build_indices_and_constraints().await?;
        Ok(client)
    }

    /// A context that never attempted (or failed) to connect. Used by the
    /// request-loop tests; `error: None` models the pre-startup state.
    pub fn disconnected(config: GraphitiConfig, error: Option<String>) -> Self {
        let status = match error {
            Some(error) => ConnectionStatus::Disconnected { error },
            None => ConnectionStatus::Uninitialized,
        };
        Self {
            config,
            status,
            graph: None,
        }
    }

    pub fn config(&self) -> &GraphitiConfig {
        &self.config
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Services available only while connected.
    pub fn services(&self) -> Option<&GraphServices> {
        self.graph.as_ref()
    }

    /// Drain queue workers (bounded wait) and close the store connection.
    pub async fn shutdown(&self) {
        if let Some(graph) = &self.graph {
            info!("draining episode queues");
            graph.queues.shutdown(SHUTDOWN_GRACE).await;
            if let Err(e) = graph.client.close().await {
                warn!(error = %e, "error closing graph connection");
            }
        }
    }
}

/// Translate common startup failures into actionable log lines.
fn diagnose(error: &str) {
    if error.contains("Connection refused") {
        error!("DIAGNOSIS: Neo4j server not running or NEO4J_URI wrong");
        info!("SOLUTIONS: start Neo4j (`neo4j start`), then verify NEO4J_URI");
    } else if error.contains("Unauthorized") || error.to_lowercase().contains("authentication") {
        error!("DIAGNOSIS: authentication failed");
        info!("SOLUTIONS: check NEO4J_USER and NEO4J_PASSWORD; reset with `neo4j-admin dbms set-initial-password`");
    }
}
