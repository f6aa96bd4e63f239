//! Tasks and their outputs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of work bound to one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Key used by the crew roster to refer to this task
    #[serde(skip)]
    pub key: String,

    /// What the agent has to do
    pub description: String,

    /// What a good final answer looks like
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,

    /// Key of the agent that performs the task
    pub agent: String,
}

impl Task {
    #[cfg(test)]
    pub fn new(key: impl Into<String>, description: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            expected_output: None,
            agent: agent.into(),
        }
    }

    #[cfg(test)]
    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Text handed to the agent as its current task
    pub fn prompt(&self) -> String {
        match self.expected_output {
            Some(ref expected) => format!(
                "{}\n\nThis is the expected criteria for your final answer: {}",
                self.description.trim(),
                expected.trim()
            ),
            None => self.description.trim().to_string(),
        }
    }
}

/// What one task produced
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task: String,
    pub description: String,
    pub agent_role: String,
    pub raw: String,
    pub completed_at: DateTime<Utc>,
}

impl TaskOutput {
    /// First line of the description, for progress logs
    pub fn summary(&self) -> &str {
        self.description.lines().next().unwrap_or_default().trim()
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
