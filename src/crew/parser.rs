//! Reasoning step parser
//!
//! Reads one model reply written in the Thought / Action / Action Input /
//! Final Answer format and decides whether the agent wants a tool or is done.

use thiserror::Error;

const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const FINAL_ANSWER: &str = "Final Answer:";

/// What the agent decided to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    /// Call a tool with the given input
    Action { tool: String, input: String },
    /// The agent's answer to the task
    Finish { output: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("reply has neither an action nor a final answer")]
    MissingAction,

    #[error("action '{0}' has no action input")]
    MissingActionInput(String),
}

/// Parse one reply.
///
/// An action that comes before a final answer wins; the model sometimes
/// writes ahead past its observation and that text is not trusted.
pub fn parse(text: &str) -> Result<AgentStep, ParseError> {
    let action_at = text.find(ACTION);
    let answer_at = text.find(FINAL_ANSWER);

    match (action_at, answer_at) {
        (Some(action), Some(answer)) if action < answer => {
            // "Action: None" followed by an answer is not a tool call
            match parse_action(&text[..answer], action) {
                Err(ParseError::MissingActionInput(_)) | Err(ParseError::MissingAction) => {
                    Ok(finish(text, answer))
                }
                step => step,
            }
        }
        (_, Some(answer)) => Ok(finish(text, answer)),
        (Some(action), None) => parse_action(text, action),
        (None, None) => Err(ParseError::MissingAction),
    }
}

fn finish(text: &str, answer_at: usize) -> AgentStep {
    AgentStep::Finish {
        output: text[answer_at + FINAL_ANSWER.len()..].trim().to_string(),
    }
}

/// Answer from a reply that is not allowed to call tools anymore
pub fn final_answer_or_raw(text: &str) -> String {
    match text.find(FINAL_ANSWER) {
        Some(at) => text[at + FINAL_ANSWER.len()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn parse_action(text: &str, action_at: usize) -> Result<AgentStep, ParseError> {
    let rest = &text[action_at + ACTION.len()..];
    let tool_line = rest.lines().next().unwrap_or_default();
    let tool = clean_tool_name(tool_line);
    if tool.is_empty() {
        return Err(ParseError::MissingAction);
    }

    let input_at = rest
        .find(ACTION_INPUT)
        .ok_or_else(|| ParseError::MissingActionInput(tool.clone()))?;
    let mut input = &rest[input_at + ACTION_INPUT.len()..];
    if let Some(end) = input.find("\nObservation") {
        input = &input[..end];
    }

    Ok(AgentStep::Action {
        tool,
        input: strip_quotes(input.trim()).to_string(),
    })
}

fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '\'' | '[' | ']'))
        .trim()
        .to_string()
}

fn strip_quotes(input: &str) -> &str {
    input
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        let reply = "Thought: Do I need to use a tool? Yes\n\
                     Action: duckduckgo_search\n\
                     Action Input: assurance vie Suisse 3e pilier";
        assert_eq!(
            parse(reply).unwrap(),
            AgentStep::Action {
                tool: "duckduckgo_search".into(),
                input: "assurance vie Suisse 3e pilier".into(),
            }
        );
    }

    #[test]
    fn test_parse_final_answer() {
        let reply = "Thought: Do I need to use a tool? No\nFinal Answer: Voici votre profil.\nMerci.";
        assert_eq!(
            parse(reply).unwrap(),
            AgentStep::Finish { output: "Voici votre profil.\nMerci.".into() }
        );
    }

    #[test]
    fn test_action_before_final_answer_wins() {
        let reply = "Action: human\nAction Input: Quel est votre âge ?\n\
                     Observation: 40 ans\nFinal Answer: made up";
        assert_eq!(
            parse(reply).unwrap(),
            AgentStep::Action { tool: "human".into(), input: "Quel est votre âge ?".into() }
        );
    }

    #[test]
    fn test_action_without_input_then_final_answer() {
        let reply = "Thought: Do I need to use a tool? No\n\
                     Action: None\n\
                     Final Answer: Voici vos recommandations.";
        assert_eq!(
            parse(reply).unwrap(),
            AgentStep::Finish { output: "Voici vos recommandations.".into() }
        );

        // An input that only shows up after the answer does not make it a call
        let reply = "Action: None\nFinal Answer: ok\nAction Input: x";
        assert_eq!(parse(reply).unwrap(), AgentStep::Finish { output: "ok\nAction Input: x".into() });
    }

    #[test]
    fn test_multiline_input_and_quotes() {
        let reply = "Action: `Delegate work to co-worker`\n\
                     Action Input: \"Policy Expert|Compare the offers|Client is 34\"";
        assert_eq!(
            parse(reply).unwrap(),
            AgentStep::Action {
                tool: "Delegate work to co-worker".into(),
                input: "Policy Expert|Compare the offers|Client is 34".into(),
            }
        );

        let reply = "Action: human\nAction Input: Première ligne\nseconde ligne";
        match parse(reply).unwrap() {
            AgentStep::Action { input, .. } => assert_eq!(input, "Première ligne\nseconde ligne"),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_replies() {
        assert_eq!(parse("I think the client needs a life policy."), Err(ParseError::MissingAction));
        assert_eq!(
            parse("Thought: let me search\nAction: duckduckgo_search"),
            Err(ParseError::MissingActionInput("duckduckgo_search".into()))
        );
        assert_eq!(parse("Action: \nAction Input: x"), Err(ParseError::MissingAction));
    }

    #[test]
    fn test_final_answer_or_raw() {
        assert_eq!(final_answer_or_raw("Thought: done\nFinal Answer: 42"), "42");
        assert_eq!(final_answer_or_raw("  just text \n"), "just text");
    }
}
