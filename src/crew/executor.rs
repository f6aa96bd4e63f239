//! Agent executor
//!
//! Runs one agent on one task: asks the model for a step, runs the tool it
//! picked, feeds the observation back, and repeats until a final answer or
//! the iteration budget runs out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LanguageModel};
use crate::tools::Tool;

use super::agent::Agent;
use super::parser::{self, AgentStep};
use super::prompt;

/// Drives the reasoning loop of a single agent
pub struct AgentExecutor<'a> {
    agent: &'a Agent,
    llm: Arc<dyn LanguageModel>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: u32,
    log_steps: bool,
}

impl<'a> AgentExecutor<'a> {
    pub fn new(
        agent: &'a Agent,
        llm: Arc<dyn LanguageModel>,
        tools: Vec<Arc<dyn Tool>>,
        max_iterations: u32,
    ) -> Self {
        Self {
            agent,
            llm,
            tools,
            max_iterations: max_iterations.max(1),
            log_steps: agent.verbose,
        }
    }

    /// Log each thought and observation at info instead of debug
    pub fn log_steps(mut self, enabled: bool) -> Self {
        self.log_steps = enabled || self.agent.verbose;
        self
    }

    /// Run the task and return the agent's final answer
    pub async fn execute(&self, task: &str, context: Option<&str>) -> Result<String> {
        let system = prompt::system(self.agent, &self.tools);
        let mut scratchpad = String::new();
        let mut last_call: Option<(String, String)> = None;

        for iteration in 1..=self.max_iterations {
            let reply = self.ask(&system, task, context, &scratchpad).await?;
            self.step("thought", iteration, &reply);

            let observation = match parser::parse(&reply) {
                Ok(AgentStep::Finish { output }) => return Ok(output),
                Ok(AgentStep::Action { tool, input }) => {
                    let call = (tool, input);
                    let observation = if last_call.as_ref() == Some(&call) {
                        format!(
                            "I just used the {} tool with input {}. So I already know the result \
                             of that and don't need to use it again now.",
                            call.0, call.1
                        )
                    } else {
                        self.use_tool(&call.0, &call.1).await?
                    };
                    last_call = Some(call);
                    observation
                }
                Err(e) if self.tools.is_empty() => {
                    debug!(agent = %self.agent.role, error = %e, "Tool-less reply taken as answer");
                    return Ok(parser::final_answer_or_raw(&reply));
                }
                Err(e) => {
                    warn!(agent = %self.agent.role, error = %e, "Unparseable agent reply");
                    prompt::FORMAT_REMINDER.to_string()
                }
            };

            self.step("observation", iteration, &observation);
            scratchpad.push_str(reply.trim_end());
            scratchpad.push_str("\nObservation: ");
            scratchpad.push_str(&observation);
            scratchpad.push_str("\nThought: ");
        }

        warn!(
            agent = %self.agent.role,
            max_iterations = self.max_iterations,
            "Iteration limit reached, forcing a final answer"
        );
        scratchpad.push_str(prompt::FORCE_ANSWER);
        scratchpad.push_str("\nFinal Answer: ");
        let reply = self.ask(&system, task, context, &scratchpad).await?;
        Ok(parser::final_answer_or_raw(&reply))
    }

    async fn ask(
        &self,
        system: &str,
        task: &str,
        context: Option<&str>,
        scratchpad: &str,
    ) -> Result<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(prompt::task(task, context, scratchpad)),
        ])
        .with_model(self.agent.llm.model.clone())
        .with_temperature(self.agent.llm.temperature)
        .with_stop(prompt::STOP_SEQUENCE);

        let completion = self.llm.complete(request).await?;
        if completion.finish_reason == FinishReason::Length {
            warn!(agent = %self.agent.role, "Reply cut off at the token limit");
        }
        Ok(completion.text)
    }

    /// Run a tool and turn its result or failure into an observation.
    ///
    /// A closed terminal or a failing co-worker model aborts; everything
    /// else is something the agent can read and recover from.
    async fn use_tool(&self, name: &str, input: &str) -> Result<String> {
        let Some(tool) = self
            .tools
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
        else {
            let names = self.tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
            return Ok(format!(
                "Action '{}' don't exist, these are the only available Actions: {}",
                name, names
            ));
        };

        info!(agent = %self.agent.role, tool = %tool.name(), "Using tool");
        match tool.run(input).await {
            Ok(output) => Ok(output),
            Err(e) if e.aborts_run() => Err(e),
            Err(e) => {
                warn!(agent = %self.agent.role, tool = %tool.name(), error = %e, "Tool failed");
                Ok(format!("Error running the {} tool: {}", tool.name(), e))
            }
        }
    }

    fn step(&self, kind: &str, iteration: u32, text: &str) {
        if self.log_steps {
            info!(agent = %self.agent.role, iteration, "{}: {}", kind, text.trim());
        } else {
            debug!(agent = %self.agent.role, iteration, "{}: {}", kind, text.trim());
        }
    }
}
