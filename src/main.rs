//! ZenCover Crew - insurance brokering agents
//!
//! This is the main entry point for the ZenCover crew binary.
//! It assembles the crew from its definition, runs every task in order
//! against the configured language model, and prints the final result.

mod cli;
mod config;
mod crew;
mod error;
mod llm;
mod logging;
mod tools;
mod version;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};

use crate::cli::{Cli, Commands, ConfigSubcommand, CrewSubcommand};
use crate::config::CrewConfig;
use crate::crew::{Crew, CrewDefinition};
use crate::error::{Error, Result};
use crate::llm::{LanguageModel, OpenAiChat};
use crate::tools::{DuckDuckGoSearch, Tool, ToolRegistry};

/// Printed between the conversation and the final result
const RESULT_SEPARATOR: &str = "######################";

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(())
        }
        Commands::Config { subcommand } => {
            logging::init_simple(Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Crew { subcommand } => {
            logging::init_simple(Level::WARN)?;
            handle_crew_command(subcommand)
        }
        Commands::Search { query, config } => {
            let config = CrewConfig::load(config.as_deref())?;
            logging::init_simple(if cli.verbose > 0 { Level::DEBUG } else { Level::WARN })?;
            run_search(&config, &query.join(" "))
        }
        Commands::Run { config, crew, env_file } => {
            config::load_env_file(env_file.as_deref().map(std::path::Path::new))?;
            let config = CrewConfig::load(config.as_deref())?;

            // The guards must be kept alive for the lifetime of the program
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

            let build = version::build_info();
            info!(
                version = %build.full_version(),
                target = %build.target,
                profile = %build.profile,
                "Starting ZenCover crew"
            );

            run_crew(config, crew)
        }
    }
}

/// Assemble the crew and run it to completion
fn run_crew(config: CrewConfig, crew_path: Option<String>) -> Result<()> {
    config.require_credentials()?;

    let definition_path = crew_path.or_else(|| config.crew.definition.clone());
    let crew = CrewDefinition::resolve(definition_path.as_deref())?
        .build()?
        .with_verbose(config.crew.verbose)
        .with_max_iterations(config.crew.max_iterations);

    let registry = ToolRegistry::from_config(&config)?;
    crew.validate_tools(&registry)?;

    info!(
        crew = %crew.name(),
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        verbose = crew.verbose(),
        max_iterations = crew.max_iterations(),
        "Crew assembled"
    );

    let chat = Arc::new(OpenAiChat::new(config.llm.clone())?);
    let llm: Arc<dyn LanguageModel> = chat.clone();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("zencover-crew")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let output = runtime.block_on(crew.kickoff(llm, &registry))?;

    info!(
        run = %output.run_id,
        tasks = output.tasks_output.len(),
        tokens = output.usage.total(),
        requests = chat.request_count(),
        "Crew run complete"
    );

    println!("{}", RESULT_SEPARATOR);
    println!("{}", output);
    Ok(())
}

/// Run the search tool once, the way an agent would
fn run_search(config: &CrewConfig, query: &str) -> Result<()> {
    let search = DuckDuckGoSearch::new(config.search.clone())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    let result = runtime.block_on(search.run(query))?;
    println!("{}", result);
    Ok(())
}

/// Handle crew definition subcommands
fn handle_crew_command(subcommand: CrewSubcommand) -> Result<()> {
    match subcommand {
        CrewSubcommand::Show { crew } => {
            let crew = CrewDefinition::resolve(crew.as_deref())?.build()?;
            print!("{}", describe_crew(&crew));
        }
        CrewSubcommand::Validate { crew } => {
            let crew = CrewDefinition::resolve(crew.as_deref())?.build()?;
            let registry = ToolRegistry::from_config(&CrewConfig::default())?;
            crew.validate_tools(&registry)?;
            println!(
                "Crew definition is valid: {} ({} agents, {} tasks).",
                crew.name(),
                crew.agents().count(),
                crew.tasks().len()
            );
        }
        CrewSubcommand::Init { path, force } => {
            let path: PathBuf = crew::init_crew_file(path.as_deref(), force)?;
            println!("Crew definition created: {}", path.display());
        }
    }

    Ok(())
}

/// Human-readable summary of a crew
fn describe_crew(crew: &Crew) -> String {
    let mut out = format!("Crew: {} ({})\n\nAgents:\n", crew.name(), crew.process());

    for agent in crew.agents() {
        out.push_str(&format!("  {:<14} {}\n", agent.key, agent.role));
        let tools = if agent.tools.is_empty() {
            "none".to_string()
        } else {
            agent.tools.join(", ")
        };
        out.push_str(&format!(
            "  {:<14} tools: {}, delegation: {}\n",
            "",
            tools,
            if agent.allow_delegation { "yes" } else { "no" }
        ));
    }

    out.push_str("\nTasks:\n");
    for (n, task) in crew.tasks().iter().enumerate() {
        let first_line = task.description.lines().next().unwrap_or_default().trim();
        out.push_str(&format!("  {}. {} -> {}\n", n + 1, task.key, task.agent));
        out.push_str(&format!("     {}\n", first_line));
    }

    out
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let mut cfg = CrewConfig::load(config.as_deref())?;
            if !cfg.llm.api_key.is_empty() {
                cfg.llm.api_key = "<redacted>".to_string();
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            config::init_config(path.as_deref(), force)?;
        }
        ConfigSubcommand::Validate { config } => {
            CrewConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
