use std::{collections::HashMap, fmt::Display, path::Path};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::{self, PersistenceError};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("FilePersistence error: {0}")]
    FilePersistenceError(#[from] PersistenceError),
}

/// Append-only log of who said what during a swarm run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AgentConversation {
    owner: String,
    pub history: Vec<Message>,
}

impl AgentConversation {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            history: Vec::new(),
        }
    }

    /// Add a message to the conversation history.
    pub fn add(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(Message {
            role,
            content: Content::Text(content.into()),
            timestamp: Local::now(),
        });
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Search for a message in the conversation history.
    pub fn search(&self, keyword: &str) -> Vec<&Message> {
        self.history
            .iter()
            .filter(|message| message.content.to_string().contains(keyword))
            .collect()
    }

    /// Messages written by the given role name, in order.
    pub fn messages_from(&self, name: &str) -> Vec<&Message> {
        self.history
            .iter()
            .filter(|message| message.role.name() == name)
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ConversationError> {
        Ok(serde_json::to_string(&self.history)?)
    }

    /// Export the conversation history to a file
    pub async fn export_to_file(&self, filepath: &Path) -> Result<(), ConversationError> {
        persistence::save_to_file(self.to_string(), filepath).await?;
        Ok(())
    }

    /// Count the number of messages by role
    pub fn count_messages_by_role(&self) -> HashMap<String, usize> {
        let mut count = HashMap::new();
        for message in &self.history {
            *count.entry(message.role.to_string()).or_insert(0) += 1;
        }
        count
    }
}

impl Display for AgentConversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for message in &self.history {
            writeln!(f, "{}: {}", message.role, message.content)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
    pub timestamp: DateTime<Local>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User(String),
    Assistant(String),
}

impl Role {
    pub fn name(&self) -> &str {
        match self {
            Role::User(name) | Role::Assistant(name) => name,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Content {
    Text(String),
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User(name) => write!(f, "{}(User)", name),
            Role::Assistant(name) => write!(f, "{}(Assistant)", name),
        }
    }
}

impl Display for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Text(text) => f.pad(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AgentConversation {
        let mut conversation = AgentConversation::new("SwarmRearrange");
        conversation.add(Role::User("User".to_owned()), "write a poem");
        conversation.add(Role::Assistant("Poet".to_owned()), "roses are red");
        conversation.add(Role::Assistant("Critic".to_owned()), "True");
        conversation
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let conversation = sample();
        let roles = conversation
            .history
            .iter()
            .map(|message| message.role.name())
            .collect::<Vec<_>>();
        assert_eq!(roles, vec!["User", "Poet", "Critic"]);
        assert_eq!(conversation.owner(), "SwarmRearrange");
    }

    #[test]
    fn test_display_and_search() {
        let conversation = sample();
        assert_eq!(
            conversation.to_string(),
            "User(User): write a poem\nPoet(Assistant): roses are red\nCritic(Assistant): True\n"
        );
        assert_eq!(conversation.search("roses").len(), 1);
        assert_eq!(
            conversation.messages_from("Critic")[0].content,
            Content::Text("True".to_owned())
        );
    }

    #[test]
    fn test_count_and_json() {
        let conversation = sample();
        let count = conversation.count_messages_by_role();
        assert_eq!(count.get("Poet(Assistant)"), Some(&1));

        let json = conversation.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(3));
        assert_eq!(value[1]["content"]["Text"], "roses are red");
    }

    #[tokio::test]
    async fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conversation.txt");
        sample().export_to_file(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.starts_with("User(User): write a poem"));
    }
}
