//! Tools agents can call during their reasoning loop
//!
//! Every tool takes free text and returns free text, which the agent reads
//! back as an observation.

mod human;
mod registry;
mod search;

use async_trait::async_trait;

use crate::error::Result;

pub use human::HumanInput;
pub use registry::ToolRegistry;
pub use search::DuckDuckGoSearch;

/// A capability an agent can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model must write after `Action:`
    fn name(&self) -> &str;

    /// One-paragraph description shown to the model
    fn description(&self) -> &str;

    /// Run the tool on the model-provided input
    async fn run(&self, input: &str) -> Result<String>;
}
