//! Swarms-rearrange routes a task through named agents following a small flow
//! language such as `"Researcher -> Writer, Critic -> H -> Editor"`.
//! This crate provides the flow parser, the agent abstractions and the
//! [`SwarmRearrange`] orchestrator, which can itself be nested as an agent.
pub mod agent;
pub mod conversation;
pub mod flow;
pub mod history;
pub mod human;
pub mod persistence;
pub mod registry;
pub mod swarm;
pub mod swarm_rearrange;

pub use agent::{Agent, AgentError, AgentOutput, FnAgent};
pub use flow::{Flow, FlowError, validate_flow};
pub use registry::{AgentRegistry, RegistryError};
pub use swarm_rearrange::{
    SwarmRearrange, SwarmRearrangeBuilder, SwarmRearrangeConfig, SwarmRearrangeError,
    swarm_arrange,
};
