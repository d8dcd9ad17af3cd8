use std::{fmt::Display, pin::Pin};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent '{agent}' failed: {message}")]
    ExecutionFailed { agent: String, message: String },
}

impl AgentError {
    pub fn execution_failed(agent: impl Into<String>, message: impl Display) -> Self {
        AgentError::ExecutionFailed {
            agent: agent.into(),
            message: message.to_string(),
        }
    }
}

/// The value an agent hands back after running a task.
///
/// Agents are free to answer with text, a boolean verdict, arbitrary JSON or
/// nothing at all. Orchestrators only ever forward text, see [`AgentOutput::into_text`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentOutput {
    Text(String),
    Flag(bool),
    Json(serde_json::Value),
    None,
}

impl AgentOutput {
    pub fn is_none(&self) -> bool {
        matches!(self, AgentOutput::None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentOutput::Text(_) => "text",
            AgentOutput::Flag(_) => "bool",
            AgentOutput::Json(_) => "json",
            AgentOutput::None => "none",
        }
    }

    /// Textual form of the output, `None` when the agent returned nothing.
    ///
    /// Booleans become `"True"` / `"False"`, JSON strings are unquoted and any
    /// other JSON value is rendered compactly.
    pub fn into_text(self) -> Option<String> {
        match self {
            AgentOutput::Text(text) => Some(text),
            AgentOutput::Flag(true) => Some("True".to_owned()),
            AgentOutput::Flag(false) => Some("False".to_owned()),
            AgentOutput::Json(serde_json::Value::String(text)) => Some(text),
            AgentOutput::Json(serde_json::Value::Null) => None,
            AgentOutput::Json(value) => Some(value.to_string()),
            AgentOutput::None => None,
        }
    }
}

impl From<String> for AgentOutput {
    fn from(text: String) -> Self {
        AgentOutput::Text(text)
    }
}

impl From<&str> for AgentOutput {
    fn from(text: &str) -> Self {
        AgentOutput::Text(text.to_owned())
    }
}

impl From<bool> for AgentOutput {
    fn from(flag: bool) -> Self {
        AgentOutput::Flag(flag)
    }
}

impl From<serde_json::Value> for AgentOutput {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AgentOutput::None,
            serde_json::Value::Bool(flag) => AgentOutput::Flag(flag),
            serde_json::Value::String(text) => AgentOutput::Text(text),
            value => AgentOutput::Json(value),
        }
    }
}

impl<T: Into<AgentOutput>> From<Option<T>> for AgentOutput {
    fn from(output: Option<T>) -> Self {
        output.map_or(AgentOutput::None, Into::into)
    }
}

/// Anything that can be handed a task inside a swarm.
///
/// `img` is an optional auxiliary input (an image path or URL) that
/// orchestrators forward untouched.
pub trait Agent: Send + Sync {
    fn run(
        &self,
        task: String,
        img: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutput, AgentError>> + Send + '_>>;

    fn name(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }
}

/// Adapter turning an async closure into an [`Agent`].
///
/// # Example
///
/// ```
/// use swarms_rearrange::agent::{Agent, AgentError, AgentOutput, FnAgent};
///
/// let echo = FnAgent::new("Echo", |task: String, _img: Option<String>| async move {
///     Ok::<_, AgentError>(AgentOutput::from(task))
/// });
/// assert_eq!(echo.name(), "Echo");
/// ```
pub struct FnAgent<F> {
    name: String,
    description: String,
    func: F,
}

impl<F, Fut> FnAgent<F>
where
    F: Fn(String, Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AgentOutput, AgentError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            func,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<F, Fut> Agent for FnAgent<F>
where
    F: Fn(String, Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AgentOutput, AgentError>> + Send + 'static,
{
    fn run(
        &self,
        task: String,
        img: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutput, AgentError>> + Send + '_>> {
        Box::pin((self.func)(task, img))
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
