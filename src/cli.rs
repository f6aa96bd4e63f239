//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the ZenCover crew.

use clap::{Parser, Subcommand};

/// ZenCover Crew - insurance brokering agents
///
/// Runs the ZenCover crew: a client information specialist, an insurance
/// matcher, and a policy expert working through a client's insurance needs
/// in turn, talking with the human at the terminal.
#[derive(Parser, Debug)]
#[command(name = "zencover-crew")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the crew and print its final result
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "ZENCOVER_CONFIG")]
        config: Option<String>,

        /// Crew definition file (defaults to the bundled ZenCover crew)
        #[arg(long)]
        crew: Option<String>,

        /// Env file to load before reading the environment
        #[arg(long)]
        env_file: Option<String>,
    },

    /// Crew definition management
    Crew {
        #[command(subcommand)]
        subcommand: CrewSubcommand,
    },

    /// Run the web search tool once and print what an agent would see
    Search {
        /// Search query
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Path to configuration file
        #[arg(short, long, env = "ZENCOVER_CONFIG")]
        config: Option<String>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Crew subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CrewSubcommand {
    /// Show the agents and tasks of a crew
    Show {
        /// Crew definition file
        #[arg(long)]
        crew: Option<String>,
    },

    /// Check a crew definition against the available tools
    Validate {
        /// Crew definition file
        #[arg(long)]
        crew: Option<String>,
    },

    /// Write the bundled crew definition to a file for editing
    Init {
        /// Where to write the definition
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
