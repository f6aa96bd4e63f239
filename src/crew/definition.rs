//! Crew definition files
//!
//! A definition is a TOML document with keyed `[agents.*]` and `[tasks.*]`
//! tables and a `[crew]` table that enlists some of them, in order. The
//! ZenCover brokering crew is bundled into the binary; a custom file can
//! replace it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{expand_path, write_new_file};
use crate::error::{Error, Result};

use super::agent::Agent;
use super::coordinator::Crew;
use super::process::Process;
use super::task::Task;

/// The ZenCover brokering crew
pub const BUNDLED_CREW: &str = include_str!("../../config/crew/zencover.toml");

/// Which agents and tasks take part, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewSection {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub process: Process,

    pub agents: Vec<String>,

    pub tasks: Vec<String>,
}

fn default_name() -> String {
    "crew".to_string()
}

/// A parsed crew definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewDefinition {
    pub crew: CrewSection,

    #[serde(default)]
    pub agents: BTreeMap<String, Agent>,

    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,
}

impl CrewDefinition {
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_CREW, "bundled crew")
    }

    /// Parse definition text; `origin` names it in error messages
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut definition: CrewDefinition =
            toml::from_str(text).map_err(|e| Error::crew_parse(origin, e))?;

        for (key, agent) in definition.agents.iter_mut() {
            agent.key = key.clone();
        }
        for (key, task) in definition.tasks.iter_mut() {
            task.key = key.clone();
        }

        debug!(
            origin,
            agents = definition.agents.len(),
            tasks = definition.tasks.len(),
            "Crew definition parsed"
        );
        Ok(definition)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let definition = Self::parse(&text, &path.display().to_string())?;
        info!(path = %path.display(), name = %definition.crew.name, "Crew definition loaded");
        Ok(definition)
    }

    /// Load from `path` when given, otherwise use the bundled crew
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(&PathBuf::from(expand_path(path))),
            None => Self::bundled(),
        }
    }

    /// Assemble the enlisted agents and tasks into a crew
    pub fn build(&self) -> Result<Crew> {
        let agents = self
            .crew
            .agents
            .iter()
            .map(|key| {
                self.agents
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::UnknownAgent { agent: key.clone() })
            })
            .collect::<Result<Vec<_>>>()?;

        let tasks = self
            .crew
            .tasks
            .iter()
            .map(|key| {
                self.tasks
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::CrewInvalid(format!("task '{}' is not defined", key)))
            })
            .collect::<Result<Vec<_>>>()?;

        for task in self.tasks.values() {
            if !self.agents.contains_key(&task.agent) {
                return Err(Error::UnknownAgent { agent: task.agent.clone() });
            }
        }

        Ok(Crew::new(agents, tasks, self.crew.process)?.with_name(self.crew.name.clone()))
    }
}

/// Write the bundled definition to disk as a starting point
pub fn init_crew_file(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = PathBuf::from(expand_path(path.unwrap_or("crew.toml")));
    write_new_file(&path, BUNDLED_CREW, force)?;
    Ok(path)
}
