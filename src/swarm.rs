use chrono::{DateTime, Local};
use erased_serde::Serialize;
use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::swarm_rearrange::SwarmRearrangeError;

/// Common surface of every orchestration structure.
pub trait Swarm {
    fn name(&self) -> &str;

    fn run(&self, task: String) -> BoxFuture<'_, Result<Box<dyn Serialize + Send>, SwarmError>>;
}

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("SwarmRearrangeError: {0}")]
    SwarmRearrangeError(#[from] SwarmRearrangeError),
}

/// Everything recorded about one run, persisted when autosave is enabled.
#[derive(Clone, Debug, serde::Serialize)]
pub struct MetadataSchema {
    pub swarm_id: String,
    pub run_id: Uuid,
    pub name: String,
    pub description: String,
    pub task: String,
    pub flow: String,
    pub max_loops: u32,
    pub agents_output_schema: Vec<AgentOutputSchema>,
    pub final_output: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct AgentOutputSchema {
    pub run_id: Uuid,
    pub agent_name: String,
    pub task: String,
    pub output: Option<String>,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    /// Milliseconds
    pub duration: i64,
}
