use std::{
    hash::{Hash, Hasher},
    path::Path,
    pin::Pin,
    sync::Arc,
};

use chrono::Local;
use dashmap::DashMap;
use futures::{StreamExt, future::BoxFuture, future::try_join_all, stream};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use twox_hash::XxHash3_64;
use uuid::Uuid;

use crate::{
    agent::{Agent, AgentError, AgentOutput},
    conversation::{AgentConversation, Role},
    flow::{Flow, FlowError, FlowStep, Member, Stage},
    history::SwarmHistory,
    human::{self, HumanHandler, HumanInputError},
    persistence,
    registry::{AgentRegistry, RegistryError},
    swarm::{AgentOutputSchema, MetadataSchema, Swarm, SwarmError},
};

/// Returned by [`SwarmRearrange::run`] when the flow no longer validates.
pub const INVALID_FLOW_MESSAGE: &str = "Invalid flow configuration.";

/// Joins the outputs of a parallel stage into the next task.
pub const PARALLEL_OUTPUT_SEPARATOR: &str = "; ";

#[derive(Debug, Error)]
pub enum SwarmRearrangeError {
    #[error("No agents found in the swarm.")]
    NoAgents,
    #[error("No flow found in the swarm.")]
    NoFlow,
    #[error("No tasks provided.")]
    EmptyTasks,
    #[error("{0}")]
    FlowError(#[from] FlowError),
    #[error("{0}")]
    RegistryError(#[from] RegistryError),
    #[error("{0}")]
    AgentError(#[from] AgentError),
    #[error("{0}")]
    HumanInputError(#[from] HumanInputError),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmRearrangeConfig {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub flow: String,
    pub max_loops: i32,
    pub verbose: bool,
    pub human_in_the_loop: bool,
    pub autosave: bool,
    pub metadata_output_dir: String,
}

impl Default for SwarmRearrangeConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: "SwarmRearrange".to_owned(),
            description: "A swarm of swarms for rearranging tasks.".to_owned(),
            flow: String::new(),
            max_loops: 1,
            verbose: true,
            human_in_the_loop: false,
            autosave: false,
            metadata_output_dir: "./temp/swarm_rearrange/metadata".to_owned(),
        }
    }
}

impl SwarmRearrangeConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Default)]
pub struct SwarmRearrangeBuilder {
    config: SwarmRearrangeConfig,
    agents: Vec<Arc<dyn Agent>>,
    custom_human_in_the_loop: Option<HumanHandler>,
}

impl SwarmRearrangeBuilder {
    pub fn config(mut self, config: SwarmRearrangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn flow(mut self, flow: impl Into<String>) -> Self {
        self.config.flow = flow.into();
        self
    }

    /// Non-positive values are treated as a single loop.
    pub fn max_loops(mut self, max_loops: i32) -> Self {
        self.config.max_loops = max_loops;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn human_in_the_loop(mut self, enabled: bool) -> Self {
        self.config.human_in_the_loop = enabled;
        self
    }

    /// Answer `H` stages with `handler` instead of stdin. Only consulted while
    /// human-in-the-loop is enabled.
    pub fn custom_human_in_the_loop(
        mut self,
        handler: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.custom_human_in_the_loop = Some(Arc::new(handler));
        self
    }

    pub fn autosave(mut self, autosave: bool) -> Self {
        self.config.autosave = autosave;
        self
    }

    pub fn metadata_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.metadata_output_dir = dir.into();
        self
    }

    pub fn add_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(self, agents: Vec<Arc<dyn Agent>>) -> Self {
        agents
            .into_iter()
            .fold(self, |builder, agent| builder.add_agent(agent))
    }

    /// Build the swarm, failing fast on an unusable configuration.
    pub fn build(self) -> Result<SwarmRearrange, SwarmRearrangeError> {
        let config = self.config;
        let agents = self.agents.into_iter().collect::<AgentRegistry>();
        let history = SwarmHistory::with_agents(agents.names());

        let swarm = SwarmRearrange {
            id: config.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: config.name.clone(),
            description: config.description,
            agents,
            flow: config.flow,
            max_loops: u32::try_from(config.max_loops).unwrap_or(0).max(1),
            verbose: config.verbose,
            human_in_the_loop: config.human_in_the_loop,
            custom_human_in_the_loop: self.custom_human_in_the_loop,
            autosave: config.autosave,
            metadata_output_dir: config.metadata_output_dir,
            history,
            conversation: Mutex::new(AgentConversation::new(config.name)),
            flow_cache: DashMap::new(),
        };
        swarm.reliability_checks()?;
        Ok(swarm)
    }
}

/// Runs a task through named agents following a flow such as `"A -> B, C -> H -> D"`.
///
/// Each stage receives what the previous stage produced. Parallel stages hand
/// every member the same input and join the answers with `"; "`. The whole
/// flow is repeated `max_loops` times, the last stage output feeding the next loop.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use swarms_rearrange::agent::{Agent, AgentError, AgentOutput, FnAgent};
/// use swarms_rearrange::swarm_rearrange::SwarmRearrange;
///
/// # tokio_test::block_on(async {
/// let shout: Arc<dyn Agent> = Arc::new(FnAgent::new("Shout", |task: String, _img| async move {
///     Ok::<_, AgentError>(AgentOutput::from(task.to_uppercase()))
/// }));
/// let exclaim: Arc<dyn Agent> = Arc::new(FnAgent::new("Exclaim", |task: String, _img| async move {
///     Ok::<_, AgentError>(AgentOutput::from(format!("{task}!")))
/// }));
///
/// let swarm = SwarmRearrange::builder()
///     .agents(vec![shout, exclaim])
///     .flow("Shout -> Exclaim")
///     .build()
///     .unwrap();
/// assert_eq!(swarm.run("hello").await, "HELLO!");
/// # });
/// ```
pub struct SwarmRearrange {
    id: String,
    name: String,
    description: String,
    agents: AgentRegistry,
    flow: String,
    max_loops: u32,
    verbose: bool,
    human_in_the_loop: bool,
    custom_human_in_the_loop: Option<HumanHandler>,
    autosave: bool,
    metadata_output_dir: String,
    history: SwarmHistory,
    conversation: Mutex<AgentConversation>,
    flow_cache: DashMap<u64, (String, Arc<Flow>)>,
}

impl SwarmRearrange {
    pub fn builder() -> SwarmRearrangeBuilder {
        SwarmRearrangeBuilder::default()
    }

    pub fn from_config(
        config: SwarmRearrangeConfig,
        agents: Vec<Arc<dyn Agent>>,
    ) -> Result<Self, SwarmRearrangeError> {
        Self::builder().config(config).agents(agents).build()
    }

    fn reliability_checks(&self) -> Result<(), SwarmRearrangeError> {
        if self.verbose {
            tracing::info!("| swarm rearrange | {} | Running reliability checks", self.name);
        }
        if self.agents.is_empty() {
            return Err(SwarmRearrangeError::NoAgents);
        }
        if self.flow.trim().is_empty() {
            return Err(SwarmRearrangeError::NoFlow);
        }
        self.validate_flow()?;

        if self.verbose {
            tracing::info!(
                "| swarm rearrange | {} | Initialized with agents: {:?}",
                self.name,
                self.agents.names()
            );
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn max_loops(&self) -> u32 {
        self.max_loops
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents.names()
    }

    /// Replace the flow. It is validated on the next run.
    pub fn set_custom_flow(&mut self, flow: impl Into<String>) {
        self.flow = flow.into();
        if self.verbose {
            tracing::info!("| swarm rearrange | {} | Custom flow set: {}", self.name, self.flow);
        }
    }

    /// Register an agent, replacing any agent with the same name.
    pub fn add_agent(&mut self, agent: Arc<dyn Agent>) {
        if self.verbose {
            tracing::info!(
                "| swarm rearrange | {} | Adding agent {} to the swarm",
                self.name,
                agent.name()
            );
        }
        self.agents.add(agent);
    }

    pub fn add_agents(&mut self, agents: impl IntoIterator<Item = Arc<dyn Agent>>) {
        agents.into_iter().for_each(|agent| self.add_agent(agent));
    }

    pub fn remove_agent(&mut self, name: &str) -> Result<Arc<dyn Agent>, SwarmRearrangeError> {
        let agent = self.agents.remove(name)?;
        if self.verbose {
            tracing::info!(
                "| swarm rearrange | {} | Removed agent {} from the swarm",
                self.name,
                name
            );
        }
        Ok(agent)
    }

    pub fn track_history(&self, agent_name: &str, result: impl Into<String>) {
        self.history.track(agent_name, result);
    }

    /// Every result `agent_name` produced so far, across runs and loops.
    pub fn history(&self, agent_name: &str) -> Vec<String> {
        self.history.get(agent_name)
    }

    pub fn swarm_history(&self) -> &SwarmHistory {
        &self.history
    }

    /// Snapshot of the shared conversation.
    pub async fn conversation(&self) -> AgentConversation {
        self.conversation.lock().await.clone()
    }

    /// Check the current flow against the registered agents.
    pub fn validate_flow(&self) -> Result<bool, SwarmRearrangeError> {
        self.checked_flow()?;
        if self.verbose {
            tracing::info!("| swarm rearrange | {} | Flow is valid", self.name);
        }
        Ok(true)
    }

    fn checked_flow(&self) -> Result<Arc<Flow>, FlowError> {
        let flow = self.parsed_flow()?;
        flow.validate(&self.agents)?;
        Ok(flow)
    }

    /// Parse the flow string, reusing an earlier parse of the same string.
    fn parsed_flow(&self) -> Result<Arc<Flow>, FlowError> {
        let key = xxhash(&self.flow);
        if let Some(entry) = self.flow_cache.get(&key) {
            let (source, flow) = entry.value();
            if *source == self.flow {
                return Ok(Arc::clone(flow));
            }
        }

        let flow = Arc::new(Flow::parse(&self.flow)?);
        self.flow_cache
            .insert(key, (self.flow.clone(), Arc::clone(&flow)));
        Ok(flow)
    }

    /// Run `task` through the flow. Never fails: errors come back as text.
    pub async fn run(&self, task: impl Into<String>) -> String {
        self.run_with(task, None, None).await
    }

    /// Run with an auxiliary input forwarded to every agent and an optional
    /// custom task. Only the first `(target, text)` pair of `custom_tasks`, in
    /// the caller's order, is used: `target` names the lead agent of the stage
    /// the text is spliced in front of. A target that leads no stage is ignored.
    pub async fn run_with(
        &self,
        task: impl Into<String>,
        img: Option<String>,
        custom_tasks: Option<Vec<(String, String)>>,
    ) -> String {
        match self.try_run(task, img, custom_tasks).await {
            Ok(output) => output,
            Err(SwarmRearrangeError::FlowError(e)) => {
                tracing::error!("| swarm rearrange | {} | Invalid flow: {}", self.name, e);
                INVALID_FLOW_MESSAGE.to_owned()
            }
            Err(e) => {
                tracing::error!("| swarm rearrange | {} | An error occurred: {}", self.name, e);
                e.to_string()
            }
        }
    }

    /// Same as [`SwarmRearrange::run_with`] but keeps the error structured.
    pub async fn try_run(
        &self,
        task: impl Into<String>,
        img: Option<String>,
        custom_tasks: Option<Vec<(String, String)>>,
    ) -> Result<String, SwarmRearrangeError> {
        let task = task.into();
        let flow = self.checked_flow()?;
        let custom_task = custom_tasks
            .as_ref()
            .and_then(|tasks| tasks.first())
            .map(|(target, text)| (target.as_str(), text.as_str()));
        let steps = flow.plan(custom_task);

        let run_id = Uuid::new_v4();
        let mut agent_outputs = Vec::new();
        let mut current_task = task.clone();

        for loop_count in 0..self.max_loops {
            if self.verbose {
                tracing::info!(
                    "| swarm rearrange | {} | Loop {}/{}",
                    self.name,
                    loop_count + 1,
                    self.max_loops
                );
            }

            for step in &steps {
                current_task = match step {
                    FlowStep::Inject(extra) => FlowStep::apply_injection(&current_task, extra),
                    FlowStep::Stage(stage) if stage.is_parallel() => {
                        self.run_parallel_stage(stage, current_task, &img, run_id, &mut agent_outputs)
                            .await?
                    }
                    FlowStep::Stage(stage) => {
                        self.run_sequential_stage(stage, current_task, &img, run_id, &mut agent_outputs)
                            .await?
                    }
                };
            }
        }

        if self.autosave {
            let metadata = MetadataSchema {
                swarm_id: self.id.clone(),
                run_id,
                name: self.name.clone(),
                description: self.description.clone(),
                task: task.clone(),
                flow: self.flow.clone(),
                max_loops: self.max_loops,
                agents_output_schema: agent_outputs,
                final_output: current_task.clone(),
                timestamp: Local::now(),
            };
            self.save_metadata(&task, &metadata).await;
        }

        Ok(current_task)
    }

    async fn run_sequential_stage(
        &self,
        stage: &Stage,
        current_task: String,
        img: &Option<String>,
        run_id: Uuid,
        agent_outputs: &mut Vec<AgentOutputSchema>,
    ) -> Result<String, SwarmRearrangeError> {
        if self.verbose {
            tracing::info!(
                "| swarm rearrange | {} | Running agents sequentially: {}",
                self.name,
                stage
            );
        }

        match stage.lead() {
            Member::Human => self.human_input(&current_task, human::SEQUENTIAL_PROMPT).await,
            Member::Agent(name) => {
                let schema = self
                    .run_agent(name, current_task.clone(), img.clone(), run_id)
                    .await?;
                let next_task = schema.output.clone().unwrap_or(current_task);
                agent_outputs.push(schema);
                Ok(next_task)
            }
        }
    }

    async fn run_parallel_stage(
        &self,
        stage: &Stage,
        current_task: String,
        img: &Option<String>,
        run_id: Uuid,
        agent_outputs: &mut Vec<AgentOutputSchema>,
    ) -> Result<String, SwarmRearrangeError> {
        if self.verbose {
            tracing::info!(
                "| swarm rearrange | {} | Running agents in parallel: {}",
                self.name,
                stage
            );
        }

        // Human members answer before the agents start, so every agent of
        // the stage works on the same input.
        let mut stage_task = current_task;
        for member in stage.members() {
            if *member == Member::Human {
                stage_task = self.human_input(&stage_task, human::PARALLEL_PROMPT).await?;
            }
        }

        let runs = stage.members().iter().filter_map(|member| match member {
            Member::Agent(name) => {
                Some(self.run_agent(name, stage_task.clone(), img.clone(), run_id))
            }
            Member::Human => None,
        });
        let schemas = try_join_all(runs).await?;

        let merged = schemas
            .iter()
            .filter_map(|schema| schema.output.as_deref())
            .collect::<Vec<_>>()
            .join(PARALLEL_OUTPUT_SEPARATOR);
        agent_outputs.extend(schemas);
        Ok(merged)
    }

    /// Invoke one agent and record its textual output in history and conversation.
    async fn run_agent(
        &self,
        name: &str,
        task: String,
        img: Option<String>,
        run_id: Uuid,
    ) -> Result<AgentOutputSchema, SwarmRearrangeError> {
        let agent = Arc::clone(self.agents.get(name)?);

        let start = Local::now();
        let output = agent.run(task.clone(), img).await?;
        let end = Local::now();

        if self.verbose {
            tracing::info!(
                "| swarm rearrange | {} | Agent {} returned result of type: {}",
                self.name,
                name,
                output.kind()
            );
        }
        if let AgentOutput::Flag(flag) = output {
            tracing::warn!(
                "| swarm rearrange | {} | Agent {} returned a boolean value: {}",
                self.name,
                name,
                flag
            );
        }

        let output = output.into_text();
        let recorded = output.clone().unwrap_or_default();
        self.history.track(name, recorded.clone());
        self.conversation
            .lock()
            .await
            .add(Role::Assistant(name.to_owned()), recorded);

        Ok(AgentOutputSchema {
            run_id,
            agent_name: name.to_owned(),
            task,
            output,
            start,
            end,
            duration: end.signed_duration_since(start).num_milliseconds(),
        })
    }

    async fn human_input(
        &self,
        task: &str,
        prompt: &'static str,
    ) -> Result<String, SwarmRearrangeError> {
        if self.verbose {
            tracing::info!("| swarm rearrange | {} | Waiting for human input", self.name);
        }
        match &self.custom_human_in_the_loop {
            Some(handler) if self.human_in_the_loop => Ok(handler(task)),
            _ => Ok(human::prompt_stdin(prompt).await?),
        }
    }

    async fn save_metadata(&self, task: &str, metadata: &MetadataSchema) {
        let metadata_path = Path::new(&self.metadata_output_dir)
            .join(format!("{:x}", xxhash(task) & 0xFFFFFFFF)) // Lower 32 bits of the hash
            .with_extension("json");

        if let Err(e) = persistence::save_json(metadata, &metadata_path).await {
            tracing::error!(
                "| swarm rearrange | {} | Failed to save metadata to {}: {}",
                self.name,
                metadata_path.display(),
                e
            );
        }
    }

    /// Runs every task through the flow concurrently, keyed by task.
    pub async fn run_batch(
        &self,
        tasks: Vec<String>,
    ) -> Result<DashMap<String, String>, SwarmRearrangeError> {
        if tasks.is_empty() {
            return Err(SwarmRearrangeError::EmptyTasks);
        }

        let results = DashMap::with_capacity(tasks.len());
        let (tx, mut rx) = mpsc::channel(tasks.len());
        stream::iter(tasks)
            .for_each_concurrent(None, |task| {
                let tx = tx.clone();
                async move {
                    let output = self.run(task.clone()).await;
                    if tx.send((task, output)).await.is_err() {
                        tracing::error!("| swarm rearrange | {} | Result channel closed", self.name);
                    }
                }
            })
            .await;
        drop(tx);

        while let Some((task, output)) = rx.recv().await {
            results.insert(task, output);
        }

        Ok(results)
    }
}

fn xxhash(value: &str) -> u64 {
    let mut hasher = XxHash3_64::default();
    value.hash(&mut hasher);
    hasher.finish()
}

impl Agent for SwarmRearrange {
    fn run(
        &self,
        task: String,
        img: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutput, AgentError>> + Send + '_>> {
        Box::pin(async move {
            self.try_run(task, img, None)
                .await
                .map(AgentOutput::Text)
                .map_err(|e| AgentError::execution_failed(&self.name, e))
        })
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

impl Swarm for SwarmRearrange {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, task: String) -> BoxFuture<'_, Result<Box<dyn erased_serde::Serialize + Send>, SwarmError>> {
        Box::pin(async move {
            self.try_run(task, None, None)
                .await
                .map(|output| Box::new(output) as Box<dyn erased_serde::Serialize + Send>)
                .map_err(SwarmError::from)
        })
    }
}

/// Build a [`SwarmRearrange`] and run `task` through it once.
///
/// Construction problems are reported the same way run failures are: as the
/// returned text.
pub async fn swarm_arrange(
    name: impl Into<String>,
    description: impl Into<String>,
    agents: Vec<Arc<dyn Agent>>,
    flow: impl Into<String>,
    task: impl Into<String>,
) -> String {
    let name = name.into();
    match SwarmRearrange::builder()
        .name(name.clone())
        .description(description)
        .agents(agents)
        .flow(flow)
        .build()
    {
        Ok(swarm) => {
            let output = swarm.run(task).await;
            tracing::info!("| swarm arrange | {} | Executed successfully", name);
            output
        }
        Err(e) => {
            tracing::error!(
                "| swarm arrange | {} | An error occurred during swarm arrangement: {}",
                name,
                e
            );
            e.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::FnAgent;

    use super::*;

    fn echo(name: &str) -> Arc<dyn Agent> {
        Arc::new(FnAgent::new(name, |task, _img| async move {
            Ok::<_, AgentError>(AgentOutput::from(task))
        }))
    }

    #[test]
    fn test_config_defaults() {
        let config = SwarmRearrangeConfig::default();
        assert_eq!(config.name, "SwarmRearrange");
        assert_eq!(config.max_loops, 1);
        assert!(config.verbose);
        assert!(!config.human_in_the_loop);
        assert!(!config.autosave);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config =
            SwarmRearrangeConfig::from_json(r#"{"flow": "A -> B", "max_loops": 2}"#).unwrap();
        assert_eq!(config.flow, "A -> B");
        assert_eq!(config.max_loops, 2);
        assert_eq!(config.name, "SwarmRearrange");
    }

    #[test]
    fn test_build_requires_agents() {
        let result = SwarmRearrange::builder().flow("A -> B").build();
        assert!(matches!(result, Err(SwarmRearrangeError::NoAgents)));
    }

    #[test]
    fn test_build_requires_flow() {
        let result = SwarmRearrange::builder().add_agent(echo("A")).flow("  ").build();
        assert!(matches!(result, Err(SwarmRearrangeError::NoFlow)));
    }

    #[test]
    fn test_build_validates_flow() {
        let result = SwarmRearrange::builder()
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> A")
            .build();
        assert!(matches!(
            result,
            Err(SwarmRearrangeError::FlowError(FlowError::DuplicateAgent(_)))
        ));

        let result = SwarmRearrange::builder()
            .agents(vec![echo("A")])
            .flow("A -> Missing")
            .build();
        assert!(matches!(
            result,
            Err(SwarmRearrangeError::FlowError(FlowError::AgentNotRegistered(_)))
        ));
    }

    #[test]
    fn test_non_positive_max_loops_coerced_to_one() {
        for max_loops in [0, -3] {
            let swarm = SwarmRearrange::builder()
                .agents(vec![echo("A"), echo("B")])
                .flow("A -> B")
                .max_loops(max_loops)
                .build()
                .unwrap();
            assert_eq!(swarm.max_loops(), 1);
        }
    }

    #[test]
    fn test_generated_and_explicit_ids() {
        let generated = SwarmRearrange::builder()
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> B")
            .build()
            .unwrap();
        assert!(Uuid::parse_str(generated.id()).is_ok());

        let explicit = SwarmRearrange::builder()
            .id("rearrange-1")
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> B")
            .build()
            .unwrap();
        assert_eq!(explicit.id(), "rearrange-1");
    }

    #[test]
    fn test_flow_parse_is_cached_per_flow_string() {
        let mut swarm = SwarmRearrange::builder()
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> B")
            .verbose(false)
            .build()
            .unwrap();

        let first = swarm.parsed_flow().unwrap();
        let second = swarm.parsed_flow().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        swarm.set_custom_flow("B -> A");
        let third = swarm.parsed_flow().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.to_string(), "B -> A");
    }

    #[tokio::test]
    async fn test_flow_invalidated_after_construction() {
        let mut swarm = SwarmRearrange::builder()
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> B")
            .verbose(false)
            .build()
            .unwrap();

        swarm.set_custom_flow("A B");
        assert_eq!(swarm.run("task").await, INVALID_FLOW_MESSAGE);

        swarm.set_custom_flow("A -> B");
        swarm.remove_agent("B").unwrap();
        assert_eq!(swarm.run("task").await, INVALID_FLOW_MESSAGE);
        assert!(matches!(
            swarm.try_run("task", None, None).await,
            Err(SwarmRearrangeError::FlowError(FlowError::AgentNotRegistered(_)))
        ));

        swarm.add_agent(echo("B"));
        assert_eq!(swarm.run("task").await, "task");
    }

    #[test]
    fn test_remove_unknown_agent_fails() {
        let mut swarm = SwarmRearrange::builder()
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> B")
            .verbose(false)
            .build()
            .unwrap();
        assert!(matches!(
            swarm.remove_agent("C"),
            Err(SwarmRearrangeError::RegistryError(RegistryError::AgentNotFound(_)))
        ));
        assert_eq!(swarm.agent_names(), vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn test_track_history() {
        let swarm = SwarmRearrange::builder()
            .agents(vec![echo("A"), echo("B")])
            .flow("A -> B")
            .verbose(false)
            .build()
            .unwrap();
        assert!(swarm.history("A").is_empty());
        swarm.track_history("A", "manual");
        assert_eq!(swarm.history("A"), vec!["manual"]);
    }
}
