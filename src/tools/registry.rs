//! Tool registry
//!
//! Maps the tool keys used in crew definitions ("search", "human") to live
//! tool handles shared by every agent that names them.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::CrewConfig;
use crate::error::{Error, Result};

use super::{DuckDuckGoSearch, HumanInput, Tool};

/// Registry of available tools keyed by definition name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the production tools: web search and the terminal human
    pub fn from_config(config: &CrewConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register("search", Arc::new(DuckDuckGoSearch::new(config.search.clone())?));
        registry.register("human", Arc::new(HumanInput::stdio()));
        debug!(tools = ?registry.keys().collect::<Vec<_>>(), "Tool registry ready");
        Ok(registry)
    }

    pub fn register(&mut self, key: impl Into<String>, tool: Arc<dyn Tool>) {
        let key = key.into();
        debug!(key = %key, tool = %tool.name(), "Tool registered");
        self.tools.insert(key, tool);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Resolve the tool keys an agent asked for, in the order given
    pub fn resolve(&self, agent: &str, keys: &[String]) -> Result<Vec<Arc<dyn Tool>>> {
        keys.iter()
            .map(|key| {
                self.get(key).ok_or_else(|| Error::UnknownTool {
                    agent: agent.to_string(),
                    tool: key.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats its input."
        }

        async fn run(&self, input: &str) -> Result<String> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn test_from_config_registers_both_tools() {
        let registry = ToolRegistry::from_config(&CrewConfig::default()).unwrap();
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["human", "search"]);
        assert_eq!(registry.get("search").unwrap().name(), "duckduckgo_search");
        assert_eq!(registry.get("human").unwrap().name(), "human");
    }

    #[test]
    fn test_resolve_preserves_order() {
        let mut registry = ToolRegistry::new();
        registry.register("echo", Arc::new(Echo));
        registry.register("search", Arc::new(DuckDuckGoSearch::new(Default::default()).unwrap()));

        let tools = registry
            .resolve("match_master", &["search".to_string(), "echo".to_string()])
            .unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["duckduckgo_search", "echo"]);
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .resolve("web_scout", &["scraper".to_string()])
            .err()
            .unwrap();
        match err {
            Error::UnknownTool { agent, tool } => {
                assert_eq!(agent, "web_scout");
                assert_eq!(tool, "scraper");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_registered_tool_runs() {
        let mut registry = ToolRegistry::new();
        registry.register("echo", Arc::new(Echo));
        assert!(registry.get("echo").is_some());
        assert_eq!(registry.get("echo").unwrap().run("salut").await.unwrap(), "salut");
    }
}
