use dashmap::DashMap;
use serde::Serialize;

/// Per-agent record of every result an agent produced, in invocation order.
///
/// Appends from concurrently running agents only contend on the shard that
/// holds their own name.
#[derive(Debug, Default, Serialize)]
pub struct SwarmHistory(DashMap<String, Vec<String>>);

impl SwarmHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create empty entries so every registered agent shows up in snapshots.
    pub fn with_agents(names: impl IntoIterator<Item = String>) -> Self {
        let history = Self::new();
        names.into_iter().for_each(|name| {
            history.0.entry(name).or_default();
        });
        history
    }

    pub fn track(&self, agent_name: impl Into<String>, result: impl Into<String>) {
        self.0.entry(agent_name.into()).or_default().push(result.into());
    }

    /// Full ordered history of one agent, empty if it never ran.
    pub fn get(&self, agent_name: &str) -> Vec<String> {
        self.0
            .get(agent_name)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    pub fn total_entries(&self) -> usize {
        self.0.iter().map(|entries| entries.len()).sum()
    }
}
