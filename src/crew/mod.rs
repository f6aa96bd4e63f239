//! Crew runtime
//!
//! Agents, tasks, the sequential coordinator, and the agent loop that
//! drives each task through the language model and tools.

mod agent;
mod coordinator;
mod definition;
mod delegation;
mod executor;
mod parser;
mod process;
mod prompt;
mod task;

pub use coordinator::Crew;
pub use definition::{init_crew_file, CrewDefinition};
