use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::agent::Agent;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent '{0}' is not registered")]
    AgentNotFound(String),
}

/// Name-keyed set of agents a flow can refer to.
///
/// Agents are shared, not owned: the caller may keep its own handle to every
/// agent it registers. Adding an agent under an existing name replaces it.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name(), agent);
    }

    pub fn add_all(&mut self, agents: impl IntoIterator<Item = Arc<dyn Agent>>) {
        agents.into_iter().for_each(|agent| self.add(agent));
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn Agent>, RegistryError> {
        self.agents
            .remove(name)
            .ok_or_else(|| RegistryError::AgentNotFound(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Agent>, RegistryError> {
        self.agents
            .get(name)
            .ok_or_else(|| RegistryError::AgentNotFound(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registered names, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.agents.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl FromIterator<Arc<dyn Agent>> for AgentRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Agent>>>(iter: I) -> Self {
        let mut registry = AgentRegistry::new();
        registry.add_all(iter);
        registry
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::{AgentError, AgentOutput, FnAgent};

    use super::*;

    fn constant(name: &str, reply: &'static str) -> Arc<dyn Agent> {
        Arc::new(FnAgent::new(name, move |_task, _img| async move {
            Ok::<_, AgentError>(AgentOutput::from(reply))
        }))
    }

    #[test]
    fn test_add_overwrites_on_name_collision() {
        let mut registry = AgentRegistry::new();
        registry.add(constant("Writer", "first"));
        registry.add(constant("Writer", "second"));
        assert_eq!(registry.len(), 1);

        let output = tokio_test::block_on(
            registry
                .get("Writer")
                .unwrap()
                .run("task".to_owned(), None),
        )
        .unwrap();
        assert_eq!(output, AgentOutput::Text("second".into()));
    }

    #[test]
    fn test_bulk_add_and_names() {
        let registry = [constant("B", "b"), constant("A", "a")]
            .into_iter()
            .collect::<AgentRegistry>();
        assert_eq!(registry.names(), vec!["A".to_owned(), "B".to_owned()]);
        assert!(registry.contains("A"));
        assert!(!registry.contains("H"));
    }

    #[test]
    fn test_remove_missing_agent_is_an_error() {
        let mut registry = AgentRegistry::new();
        registry.add(constant("A", "a"));

        assert!(registry.remove("A").is_ok());
        assert!(registry.is_empty());
        assert_eq!(
            registry.remove("A").err(),
            Some(RegistryError::AgentNotFound("A".to_owned()))
        );
    }
}
