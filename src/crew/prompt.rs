//! Prompt text for the agent loop

use std::sync::Arc;

use crate::tools::Tool;

use super::agent::Agent;

/// Stop sequence that keeps the model from inventing tool results
pub const STOP_SEQUENCE: &str = "\nObservation";

/// Observation returned when a reply can't be parsed
pub const FORMAT_REMINDER: &str = "Invalid Format: I did not follow the expected format. \
    I will use 'Action:' and 'Action Input:' to call a tool, or give my answer as \
    'Final Answer: [my response here]' if I don't need a tool.";

/// Appended once the iteration budget is spent
pub const FORCE_ANSWER: &str = "I've used too many tools for this task. \
    I will not use any more tools and will give my absolute BEST Final Answer now.";

/// System message: who the agent is and how it talks to tools
pub fn system(agent: &Agent, tools: &[Arc<dyn Tool>]) -> String {
    let mut prompt = format!(
        "You are {}.\n{}\n\nYour personal goal is: {}",
        agent.role.trim(),
        agent.backstory.trim(),
        agent.goal.trim()
    );

    if tools.is_empty() {
        prompt.push_str(
            "\n\nYou have no tools. When you have your answer you MUST use the format:\n\n\
             Thought: Do I need to use a tool? No\n\
             Final Answer: [your response here]",
        );
        return prompt;
    }

    prompt.push_str("\n\nTOOLS:\n------\nYou have access to only the following tools:\n\n");
    for tool in tools {
        prompt.push_str(&format!("{}: {}\n", tool.name(), tool.description()));
    }

    let names = tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
    prompt.push_str(&format!(
        "\nTo use a tool, please use the exact following format:\n\n\
         Thought: Do I need to use a tool? Yes\n\
         Action: the action to take, should be one of [{}], just the name, exactly as it's written.\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\n\
         When you have a response for your task, or if you do not need to use a tool, \
         you MUST use the format:\n\n\
         Thought: Do I need to use a tool? No\n\
         Final Answer: [your response here]",
        names
    ));
    prompt
}

/// User message: the task, any context, and the steps taken so far
pub fn task(task: &str, context: Option<&str>, scratchpad: &str) -> String {
    let mut prompt = format!(
        "Begin! This is VERY important to you, your job depends on it!\n\nCurrent Task: {}",
        task.trim()
    );
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nThis is the context you are working with:\n");
        prompt.push_str(context.trim());
    }
    prompt.push_str("\n\n");
    prompt.push_str(scratchpad);
    prompt
}
