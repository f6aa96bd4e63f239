//! Delegation tools
//!
//! An agent allowed to delegate gets two extra tools: one hands a piece of
//! work to a co-worker, the other asks a co-worker a question. Both take
//! `coworker|task|context` as input and run the co-worker's own reasoning
//! loop. Co-workers never receive delegation tools themselves.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{Error, Result};
use crate::llm::LanguageModel;
use crate::tools::Tool;

use super::agent::Agent;
use super::executor::AgentExecutor;

pub const DELEGATE_WORK: &str = "Delegate work to co-worker";
pub const ASK_QUESTION: &str = "Ask question to co-worker";

/// A crew member reachable through delegation
#[derive(Clone)]
pub struct Coworker {
    pub agent: Arc<Agent>,
    pub tools: Vec<Arc<dyn Tool>>,
}

struct Team {
    coworkers: Vec<Coworker>,
    llm: Arc<dyn LanguageModel>,
    max_iterations: u32,
    log_steps: bool,
}

impl Team {
    fn roles(&self) -> String {
        self.coworkers
            .iter()
            .map(|c| c.agent.role.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn find(&self, role: &str) -> Option<&Coworker> {
        let role = role.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        self.coworkers
            .iter()
            .find(|c| c.agent.role.trim().eq_ignore_ascii_case(role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Delegate,
    Ask,
}

/// Hands work or questions to another crew member
pub struct DelegationTool {
    mode: Mode,
    team: Arc<Team>,
    description: String,
}

impl DelegationTool {
    /// Both delegation tools over the same set of co-workers
    pub fn pair(
        coworkers: Vec<Coworker>,
        llm: Arc<dyn LanguageModel>,
        max_iterations: u32,
        log_steps: bool,
    ) -> Vec<Arc<dyn Tool>> {
        let team = Arc::new(Team { coworkers, llm, max_iterations, log_steps });
        let roles = team.roles();

        let delegate = DelegationTool {
            mode: Mode::Delegate,
            team: team.clone(),
            description: format!(
                "Useful to delegate a specific task to one of the following co-workers: [{roles}]. \
                 The input to this tool should be a pipe (|) separated text of length 3 (three), \
                 representing the co-worker you want to ask it to (one of the options), the task \
                 and all actual context you have for the task. For example, `coworker|task|context`."
            ),
        };
        let ask = DelegationTool {
            mode: Mode::Ask,
            team,
            description: format!(
                "Useful to ask a question, opinion or take from one of the following co-workers: \
                 [{roles}]. The input to this tool should be a pipe (|) separated text of length \
                 3 (three), representing the co-worker you want to ask it to (one of the options), \
                 the question and all actual context you have for the question. For example, \
                 `coworker|question|context`."
            ),
        };

        vec![Arc::new(delegate), Arc::new(ask)]
    }

    fn split_input<'a>(&self, input: &'a str) -> Result<(&'a str, &'a str, Option<&'a str>)> {
        let mut parts = input.splitn(3, '|').map(str::trim);
        let coworker = parts.next().unwrap_or_default();
        let task = parts.next().unwrap_or_default();
        let context = parts.next().filter(|c| !c.is_empty());

        if coworker.is_empty() || task.is_empty() {
            return Err(Error::tool_failed(
                self.name(),
                "Missing exact 3 pipe (|) separated values. The input must be \
                 `coworker|task|context`, with the co-worker's role first.",
            ));
        }
        Ok((coworker, task, context))
    }
}

#[async_trait]
impl Tool for DelegationTool {
    fn name(&self) -> &str {
        match self.mode {
            Mode::Delegate => DELEGATE_WORK,
            Mode::Ask => ASK_QUESTION,
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, input: &str) -> Result<String> {
        let (role, task, context) = self.split_input(input)?;
        let coworker = self.team.find(role).ok_or_else(|| {
            Error::tool_failed(
                self.name(),
                format!(
                    "Co-worker '{}' not found, it must be one of the following options: {}",
                    role,
                    self.team.roles()
                ),
            )
        })?;

        info!(coworker = %coworker.agent.role, mode = ?self.mode, "Delegating to co-worker");
        AgentExecutor::new(
            &coworker.agent,
            self.team.llm.clone(),
            coworker.tools.clone(),
            self.team.max_iterations,
        )
        .log_steps(self.team.log_steps)
        .execute(task, context)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    fn coworkers() -> Vec<Coworker> {
        vec![
            Coworker {
                agent: Arc::new(Agent::new("policy_pro", "Policy Expert", "Compare", "Detail-minded.")),
                tools: vec![],
            },
            Coworker {
                agent: Arc::new(Agent::new(
                    "info_gather",
                    "Client Information Specialist",
                    "Collect",
                    "Warm.",
                )),
                tools: vec![],
            },
        ]
    }

    #[test]
    fn test_pair_names_and_descriptions() {
        let llm = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let tools = DelegationTool::pair(coworkers(), llm, 5, false);

        assert_eq!(tools[0].name(), DELEGATE_WORK);
        assert_eq!(tools[1].name(), ASK_QUESTION);
        assert!(tools[0]
            .description()
            .contains("[Policy Expert, Client Information Specialist]"));
    }

    #[tokio::test]
    async fn test_delegate_runs_coworker() {
        let llm = Arc::new(ScriptedModel::new(["Final Answer: Police A est meilleure"]));
        let tools = DelegationTool::pair(coworkers(), llm.clone(), 5, false);

        let answer = tools[0]
            .run("policy expert | Compare policy A and B | Client is 34, non-smoker")
            .await
            .unwrap();

        assert_eq!(answer, "Police A est meilleure");
        let prompt = llm.prompt(0);
        assert!(prompt.starts_with("You are Policy Expert."));
        assert!(prompt.contains("Current Task: Compare policy A and B"));
        assert!(prompt.contains("Client is 34, non-smoker"));
        assert!(!prompt.contains(DELEGATE_WORK));
    }

    #[tokio::test]
    async fn test_ask_without_context() {
        let llm = Arc::new(ScriptedModel::new(["Final Answer: 34 ans"]));
        let tools = DelegationTool::pair(coworkers(), llm.clone(), 5, false);

        let answer = tools[1]
            .run("Client Information Specialist|How old is the client?")
            .await
            .unwrap();

        assert_eq!(answer, "34 ans");
        assert!(!llm.prompt(0).contains("context you are working with"));
    }

    #[tokio::test]
    async fn test_unknown_coworker() {
        let llm = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let tools = DelegationTool::pair(coworkers(), llm.clone(), 5, false);

        let err = tools[0].run("Actuary|Compute premium|").await.unwrap_err();
        assert!(err.to_string().contains("Policy Expert, Client Information Specialist"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_input() {
        let llm = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let tools = DelegationTool::pair(coworkers(), llm, 5, false);

        let err = tools[0].run("Policy Expert").await.unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
    }
}
