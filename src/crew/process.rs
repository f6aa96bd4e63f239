//! Crew execution mode

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a crew walks through its tasks.
///
/// Only sequential execution exists: tasks run in roster order and each
/// sees the previous task's output as context. Any other value in a crew
/// definition fails to deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    #[default]
    Sequential,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
        }
    }
}
