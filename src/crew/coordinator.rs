//! Crew coordinator
//!
//! Holds the agents and tasks of a crew, checks that they fit together, and
//! runs the tasks in order, passing each output to the next task.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::llm::{LanguageModel, TokenUsage};
use crate::tools::{Tool, ToolRegistry};

use super::agent::Agent;
use super::delegation::{Coworker, DelegationTool};
use super::executor::AgentExecutor;
use super::process::Process;
use super::task::{Task, TaskOutput};

/// Default iteration budget per agent
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// A team of agents and the tasks they work through
#[derive(Debug, Clone)]
pub struct Crew {
    name: String,
    agents: Vec<Arc<Agent>>,
    tasks: Vec<Task>,
    process: Process,
    verbose: u8,
    max_iterations: u32,
}

/// Result of a crew run
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutput {
    pub run_id: Uuid,
    /// Output of the last task
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    #[serde(skip)]
    pub usage: TokenUsage,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Crew {
    /// Build a crew, checking that every task's agent is enlisted
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>, process: Process) -> Result<Self> {
        if agents.is_empty() {
            return Err(Error::CrewInvalid("a crew needs at least one agent".into()));
        }
        if tasks.is_empty() {
            return Err(Error::CrewInvalid("a crew needs at least one task".into()));
        }

        let mut agent_keys = HashSet::new();
        for agent in &agents {
            if agent.key.trim().is_empty() {
                return Err(Error::CrewInvalid(format!("agent '{}' has no key", agent.role)));
            }
            if agent.role.trim().is_empty() {
                return Err(Error::CrewInvalid(format!("agent '{}' has no role", agent.key)));
            }
            if !agent_keys.insert(agent.key.as_str()) {
                return Err(Error::CrewInvalid(format!("agent '{}' is listed twice", agent.key)));
            }
        }

        let mut roles = HashSet::new();
        for agent in &agents {
            if !roles.insert(agent.role.trim().to_lowercase()) {
                return Err(Error::CrewInvalid(format!(
                    "two agents share the role '{}'; delegation could not tell them apart",
                    agent.role
                )));
            }
        }

        let mut task_keys = HashSet::new();
        for task in &tasks {
            if !task_keys.insert(task.key.as_str()) {
                return Err(Error::CrewInvalid(format!("task '{}' is listed twice", task.key)));
            }
            if task.description.trim().is_empty() {
                return Err(Error::CrewInvalid(format!("task '{}' has no description", task.key)));
            }
            if !agent_keys.contains(task.agent.as_str()) {
                return Err(Error::AgentNotInCrew {
                    task: task.key.clone(),
                    agent: task.agent.clone(),
                });
            }
        }

        Ok(Self {
            name: "crew".to_string(),
            agents: agents.into_iter().map(Arc::new).collect(),
            tasks,
            process,
            verbose: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 0 = quiet, 1 = task progress, 2 = every reasoning step
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose.min(2);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().map(Arc::as_ref)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn agent(&self, key: &str) -> Option<&Agent> {
        self.agents().find(|a| a.key == key)
    }

    /// Check that every tool an agent names exists in the registry
    pub fn validate_tools(&self, registry: &ToolRegistry) -> Result<()> {
        self.resolve_tools(registry).map(|_| ())
    }

    fn resolve_tools(&self, registry: &ToolRegistry) -> Result<BTreeMap<String, Vec<Arc<dyn Tool>>>> {
        self.agents
            .iter()
            .map(|agent| Ok((agent.key.clone(), registry.resolve(&agent.key, &agent.tools)?)))
            .collect()
    }

    /// Run every task in order and return the last output
    pub async fn kickoff(&self, llm: Arc<dyn LanguageModel>, registry: &ToolRegistry) -> Result<CrewOutput> {
        let run_id = Uuid::new_v4();
        let span = info_span!("crew", name = %self.name, run = %run_id);

        async move {
            let toolsets = self.resolve_tools(registry)?;
            info!(
                process = %self.process,
                agents = self.agents.len(),
                tasks = self.tasks.len(),
                llm = llm.name(),
                model = %llm.default_model(),
                "Crew kickoff"
            );

            let outputs = match self.process {
                Process::Sequential => self.run_sequential(&llm, &toolsets).await?,
            };

            let raw = outputs.last().map(|o| o.raw.clone()).unwrap_or_default();
            let usage = llm.usage();
            info!(tokens = usage.total(), "Crew finished");

            Ok(CrewOutput { run_id, raw, tasks_output: outputs, usage })
        }
        .instrument(span)
        .await
    }

    async fn run_sequential(
        &self,
        llm: &Arc<dyn LanguageModel>,
        toolsets: &BTreeMap<String, Vec<Arc<dyn Tool>>>,
    ) -> Result<Vec<TaskOutput>> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let agent = self
                .agent(&task.agent)
                .ok_or_else(|| Error::UnknownAgent { agent: task.agent.clone() })?;

            if self.verbose >= 1 {
                info!(task = %task.key, "Working Agent: {}", agent.role);
                info!(task = %task.key, "Starting Task: {}", task.description.trim());
            }

            let tools = self.tools_for(agent, llm, toolsets);
            let context = outputs.last().map(|o| o.raw.as_str());
            let raw = AgentExecutor::new(agent, llm.clone(), tools, self.max_iterations)
                .log_steps(self.verbose >= 2)
                .execute(&task.prompt(), context)
                .await
                .map_err(|e| {
                    error!(task = %task.key, agent = %agent.role, error = %e.format_for_log(), "Task failed");
                    e
                })?;

            if raw.trim().is_empty() {
                return Err(Error::TaskFailed {
                    task: task.key.clone(),
                    message: format!("{} returned an empty answer", agent.role),
                });
            }

            let output = TaskOutput {
                task: task.key.clone(),
                description: task.description.clone(),
                agent_role: agent.role.clone(),
                raw,
                completed_at: Utc::now(),
            };
            if self.verbose >= 1 {
                info!(task = %task.key, summary = %output.summary(), "[{}] Task output: {}", agent.role, output.raw);
            } else {
                debug!(task = %task.key, summary = %output.summary(), "Task complete");
            }
            outputs.push(output);
        }

        Ok(outputs)
    }

    fn tools_for(
        &self,
        agent: &Agent,
        llm: &Arc<dyn LanguageModel>,
        toolsets: &BTreeMap<String, Vec<Arc<dyn Tool>>>,
    ) -> Vec<Arc<dyn Tool>> {
        let mut tools = toolsets.get(&agent.key).cloned().unwrap_or_default();
        if !agent.allow_delegation {
            return tools;
        }

        let coworkers: Vec<Coworker> = self
            .agents
            .iter()
            .filter(|other| other.key != agent.key)
            .map(|other| Coworker {
                agent: other.clone(),
                tools: toolsets.get(&other.key).cloned().unwrap_or_default(),
            })
            .collect();

        if !coworkers.is_empty() {
            tools.extend(DelegationTool::pair(
                coworkers,
                llm.clone(),
                self.max_iterations,
                self.verbose >= 2,
            ));
        }
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::tools::HumanInput;
    use std::io::Cursor;

    fn agents() -> Vec<Agent> {
        vec![
            Agent::new("info_gather", "Client Information Specialist", "Collect", "Warm."),
            Agent::new("match_master", "Master Insurance Matcher", "Match", "Sharp.")
                .allow_delegation(true),
            Agent::new("policy_pro", "Policy Expert", "Explain", "Patient."),
        ]
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("info_gather", "Gather the client's details", "info_gather"),
            Task::new("match_master", "Find matching policies", "match_master"),
            Task::new("policy_pro", "Explain the best policy", "policy_pro"),
        ]
    }

    #[test]
    fn test_new_validates_structure() {
        assert!(matches!(
            Crew::new(vec![], tasks(), Process::Sequential),
            Err(Error::CrewInvalid(_))
        ));
        assert!(matches!(
            Crew::new(agents(), vec![], Process::Sequential),
            Err(Error::CrewInvalid(_))
        ));

        let mut duplicated = agents();
        duplicated.push(Agent::new("info_gather", "Other", "g", "b"));
        assert!(matches!(
            Crew::new(duplicated, tasks(), Process::Sequential),
            Err(Error::CrewInvalid(_))
        ));

        let mut same_role = agents();
        same_role.push(Agent::new("other", "policy expert", "g", "b"));
        assert!(matches!(
            Crew::new(same_role, tasks(), Process::Sequential),
            Err(Error::CrewInvalid(_))
        ));
    }

    #[test]
    fn test_task_agent_must_be_enlisted() {
        let mut tasks = tasks();
        tasks.push(Task::new("web_scout", "Scan the web", "web_scout"));

        match Crew::new(agents(), tasks, Process::Sequential) {
            Err(Error::AgentNotInCrew { task, agent }) => {
                assert_eq!(task, "web_scout");
                assert_eq!(agent, "web_scout");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_builder_clamps() {
        let crew = Crew::new(agents(), tasks(), Process::Sequential)
            .unwrap()
            .with_name("zencover")
            .with_verbose(7)
            .with_max_iterations(0);
        assert_eq!(crew.name(), "zencover");
        assert_eq!(crew.verbose(), 2);
        assert_eq!(crew.max_iterations(), 1);
        assert_eq!(crew.agent("policy_pro").unwrap().role, "Policy Expert");
    }

    #[test]
    fn test_validate_tools() {
        let mut agents = agents();
        agents[0] = agents[0].clone().with_tools(["human"]);
        let crew = Crew::new(agents, tasks(), Process::Sequential).unwrap();

        assert!(matches!(
            crew.validate_tools(&ToolRegistry::new()),
            Err(Error::UnknownTool { .. })
        ));

        let mut registry = ToolRegistry::new();
        registry.register("human", Arc::new(HumanInput::with_io(Cursor::new(""), std::io::sink())));
        assert!(crew.validate_tools(&registry).is_ok());
    }

    #[tokio::test]
    async fn test_kickoff_chains_context() {
        let llm = Arc::new(ScriptedModel::new([
            "Final Answer: Profil: 34 ans, non-fumeur",
            "Final Answer: Police vie temporaire",
            "Final Answer: Explication détaillée",
        ]));
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap().with_verbose(2);

        let output = crew.kickoff(llm.clone(), &ToolRegistry::new()).await.unwrap();

        assert_eq!(output.raw, "Explication détaillée");
        assert_eq!(output.to_string(), "Explication détaillée");
        assert_eq!(output.tasks_output.len(), 3);
        assert_eq!(output.tasks_output[1].agent_role, "Master Insurance Matcher");
        assert_eq!(output.usage.total(), 6);

        assert!(!llm.prompt(0).contains("context you are working with"));
        assert!(llm.prompt(1).contains("Profil: 34 ans, non-fumeur"));
        assert!(llm.prompt(2).contains("Police vie temporaire"));
        assert!(!llm.prompt(2).contains("Profil: 34 ans"));
    }

    #[tokio::test]
    async fn test_delegation_only_for_allowed_agents() {
        let llm = Arc::new(ScriptedModel::new(["Final Answer: a", "Final Answer: b", "Final Answer: c"]));
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap();

        crew.kickoff(llm.clone(), &ToolRegistry::new()).await.unwrap();

        assert!(!llm.prompt(0).contains("Delegate work to co-worker"));
        let matcher = llm.prompt(1);
        assert!(matcher.contains("Delegate work to co-worker"));
        assert!(matcher.contains("Ask question to co-worker"));
        assert!(matcher.contains("Policy Expert"));
        assert!(!llm.prompt(2).contains("Delegate work to co-worker"));
    }

    #[tokio::test]
    async fn test_delegation_round_trip() {
        let llm = Arc::new(ScriptedModel::new([
            "Final Answer: profil",
            "Action: Ask question to co-worker\nAction Input: Policy Expert|Which policy fits?|profil",
            "Final Answer: la police B",
            "Final Answer: Je recommande la police B",
            "Final Answer: explication",
        ]));
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap();

        let output = crew.kickoff(llm.clone(), &ToolRegistry::new()).await.unwrap();

        assert_eq!(output.tasks_output[1].raw, "Je recommande la police B");
        assert!(llm.prompt(2).starts_with("You are Policy Expert."));
        assert!(llm.prompt(3).contains("Observation: la police B"));
    }

    #[tokio::test]
    async fn test_empty_answer_fails_task() {
        let llm = Arc::new(ScriptedModel::new(["Final Answer:   "]));
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap();

        match crew.kickoff(llm, &ToolRegistry::new()).await {
            Err(Error::TaskFailed { task, .. }) => assert_eq!(task, "info_gather"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_error_stops_run() {
        let llm = Arc::new(ScriptedModel::new(["Final Answer: a"]));
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap();

        assert!(matches!(
            crew.kickoff(llm.clone(), &ToolRegistry::new()).await,
            Err(Error::Internal(_))
        ));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_coworker_model_error_stops_run() {
        let llm = Arc::new(
            ScriptedModel::new([
                "Final Answer: profil",
                "Action: Delegate work to co-worker\nAction Input: Policy Expert|Compare A and B|profil",
                "Final Answer: made it anyway",
                "Final Answer: explication",
            ])
            .failing_at(2, 500),
        );
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap();

        match crew.kickoff(llm.clone(), &ToolRegistry::new()).await {
            Err(Error::Api { status, .. }) => assert_eq!(status, 500),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(llm.call_count(), 3);
        assert!(llm.prompt(2).starts_with("You are Policy Expert."));
    }

    #[test]
    fn test_kickoff_blocking() {
        let llm = Arc::new(ScriptedModel::new(["Final Answer: a", "Final Answer: b", "Final Answer: c"]));
        let crew = Crew::new(agents(), tasks(), Process::Sequential).unwrap();

        let output = tokio_test::block_on(crew.kickoff(llm, &ToolRegistry::new())).unwrap();
        assert_eq!(output.raw, "c");
        assert!(output.tasks_output.windows(2).all(|w| w[0].completed_at <= w[1].completed_at));
    }
}
