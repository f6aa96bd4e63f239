//! Agent personas

use std::fmt;

use serde::{Deserialize, Serialize};

/// Model parameters an agent may pin for itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A named role with the prompt that makes the model play it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Key used by tasks and the crew roster to refer to this agent
    #[serde(skip)]
    pub key: String,

    /// Job title the model plays (e.g. "Master Insurance Matcher")
    pub role: String,

    /// What the agent is trying to achieve
    pub goal: String,

    /// Background that shapes tone and behavior
    pub backstory: String,

    /// Log every reasoning step of this agent
    #[serde(default)]
    pub verbose: bool,

    /// May hand work to or question the other crew members
    #[serde(default)]
    pub allow_delegation: bool,

    /// Tool keys from the tool registry
    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default, skip_serializing_if = "is_default_llm")]
    pub llm: LlmOverrides,
}

fn is_default_llm(llm: &LlmOverrides) -> bool {
    *llm == LlmOverrides::default()
}

#[cfg(test)]
impl Agent {
    pub fn new(
        key: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            verbose: false,
            allow_delegation: false,
            tools: Vec::new(),
            llm: LlmOverrides::default(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.llm.temperature = Some(temperature);
        self
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.role, self.key)
    }
}
