//! The flow language.
//!
//! ```text
//! flow      := stage ("->" stage)*
//! stage     := member ("," member)*
//! member    := agent_name | "H"
//! ```
//!
//! A stage with a single member runs sequentially, a stage with several members
//! runs them side by side on the same input. `H` marks a human intervention point.
//! A name may appear only once in the whole flow.

use std::{collections::HashSet, fmt::Display, str::FromStr};

use thiserror::Error;

use crate::registry::AgentRegistry;

pub const STAGE_SEPARATOR: &str = "->";
pub const MEMBER_SEPARATOR: char = ',';
pub const HUMAN: &str = "H";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Flow must include '->' to denote the direction of the task.")]
    MissingSeparator,
    #[error("Stage {stage} of the flow contains an empty agent name.")]
    EmptyMember { stage: usize },
    #[error("Agent '{0}' is not registered.")]
    AgentNotRegistered(String),
    #[error("Duplicate agent names in the flow are not allowed: '{0}'.")]
    DuplicateAgent(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Member {
    Agent(String),
    Human,
}

impl Member {
    fn parse(name: &str) -> Self {
        if name == HUMAN {
            Member::Human
        } else {
            Member::Agent(name.to_owned())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::Agent(name) => name,
            Member::Human => HUMAN,
        }
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    members: Vec<Member>,
}

impl Stage {
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn is_parallel(&self) -> bool {
        self.members.len() > 1
    }

    /// First member of the stage, the name custom tasks are addressed to.
    pub fn lead(&self) -> &Member {
        // Safety: `Flow::parse` never builds a stage without members
        &self.members[0]
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .members
            .iter()
            .map(Member::name)
            .collect::<Vec<_>>();
        f.write_str(&names.join(", "))
    }
}

/// A parsed flow: the ordered stages of a rearrangement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flow {
    stages: Vec<Stage>,
}

impl Flow {
    /// Split the flow into stages and members, trimming whitespace around names.
    pub fn parse(flow: &str) -> Result<Self, FlowError> {
        if !flow.contains(STAGE_SEPARATOR) {
            return Err(FlowError::MissingSeparator);
        }

        let stages = flow
            .split(STAGE_SEPARATOR)
            .enumerate()
            .map(|(index, stage)| {
                let members = stage
                    .split(MEMBER_SEPARATOR)
                    .map(str::trim)
                    .map(|name| {
                        if name.is_empty() {
                            Err(FlowError::EmptyMember { stage: index })
                        } else {
                            Ok(Member::parse(name))
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Stage { members })
            })
            .collect::<Result<Vec<_>, FlowError>>()?;

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Check the flow against the registry.
    ///
    /// Members are checked in flow order and the first unknown agent is
    /// reported before any duplicate. Duplicates are counted across the whole
    /// flow, `H` included.
    pub fn validate(&self, registry: &AgentRegistry) -> Result<(), FlowError> {
        let mut seen = HashSet::new();
        let mut duplicate = None;

        for member in self.stages.iter().flat_map(|stage| stage.members.iter()) {
            if let Member::Agent(name) = member {
                if !registry.contains(name) {
                    return Err(FlowError::AgentNotRegistered(name.clone()));
                }
            }
            if !seen.insert(member) && duplicate.is_none() {
                duplicate = Some(member.name().to_owned());
            }
        }

        match duplicate {
            Some(name) => Err(FlowError::DuplicateAgent(name)),
            None => Ok(()),
        }
    }

    /// Lay the flow out as executable steps, splicing in a custom task.
    ///
    /// The custom task is addressed to the lead member of a stage. It is
    /// inserted right before that stage, i.e. merged onto whatever the
    /// preceding stage hands forward, or as a new leading step when the
    /// target is the first stage. Unknown targets leave the flow untouched.
    pub fn plan(&self, custom_task: Option<(&str, &str)>) -> Vec<FlowStep> {
        let mut steps = self
            .stages
            .iter()
            .cloned()
            .map(FlowStep::Stage)
            .collect::<Vec<_>>();

        if let Some((target, task)) = custom_task {
            match self
                .stages
                .iter()
                .position(|stage| stage.lead().name() == target)
            {
                Some(position) => steps.insert(position, FlowStep::Inject(task.to_owned())),
                None => tracing::debug!(
                    "| flow | Custom task target '{}' is not the lead of any stage",
                    target
                ),
            }
        }

        steps
    }
}

impl FromStr for Flow {
    type Err = FlowError;

    fn from_str(flow: &str) -> Result<Self, Self::Err> {
        Flow::parse(flow)
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stages = self
            .stages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        f.write_str(&stages.join(" -> "))
    }
}

/// One step of an execution plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowStep {
    Stage(Stage),
    /// Extra task text joined onto the running task with the stage separator.
    Inject(String),
}

impl FlowStep {
    pub fn apply_injection(task: &str, injected: &str) -> String {
        format!("{task} {STAGE_SEPARATOR} {injected}")
    }
}

/// Parse and validate `flow` in one go.
pub fn validate_flow(flow: &str, registry: &AgentRegistry) -> Result<bool, FlowError> {
    Flow::parse(flow)?.validate(registry)?;
    Ok(true)
}
