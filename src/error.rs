//! Error types for the ZenCover crew
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for crew operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    MissingApiKey = 103,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Language model / connection errors (3xx)
    ConnectionFailed = 300,
    ConnectionTimeout = 301,
    RateLimited = 302,
    ApiError = 303,
    MalformedResponse = 304,

    // Crew definition errors (4xx)
    CrewParseError = 400,
    CrewInvalid = 401,
    UnknownAgent = 402,
    AgentNotInCrew = 403,
    UnknownTool = 404,

    // Execution errors (5xx)
    TaskFailed = 500,
    ToolFailed = 501,
    HumanInputClosed = 502,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Language model errors
            400..=499 => 40, // Crew definition errors
            500..=599 => 50, // Execution errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the crew
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No API key for a provider that requires one
    #[error("No API key configured for {base_url}")]
    MissingApiKey { base_url: String },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Language Model Errors
    // ─────────────────────────────────────────────────────────────

    /// Could not reach an HTTP endpoint
    #[error("Failed to connect to {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// HTTP request timed out
    #[error("Request to {url} timed out")]
    ConnectionTimeout { url: String },

    /// Provider throttled the request
    #[error("Rate limited by {url}: {message}")]
    RateLimited { url: String, message: String },

    /// Provider returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Provider response could not be interpreted
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    // ─────────────────────────────────────────────────────────────
    // Crew Definition Errors
    // ─────────────────────────────────────────────────────────────

    /// Crew definition file could not be parsed
    #[error("Failed to parse crew definition: {message}")]
    CrewParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Crew definition is structurally invalid
    #[error("Invalid crew: {0}")]
    CrewInvalid(String),

    /// A key refers to an agent that is not defined
    #[error("Unknown agent '{agent}'")]
    UnknownAgent { agent: String },

    /// A task is bound to an agent that was not enlisted in the crew
    #[error("Task '{task}' is bound to agent '{agent}', which is not part of the crew")]
    AgentNotInCrew { task: String, agent: String },

    /// An agent names a tool the registry does not provide
    #[error("Agent '{agent}' uses unknown tool '{tool}'")]
    UnknownTool { agent: String, tool: String },

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// A task could not be completed
    #[error("Task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    /// A tool invocation failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// The terminal closed while a human answer was expected
    #[error("Human input closed before an answer was given")]
    HumanInputClosed,

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::MissingApiKey { .. } => ErrorCode::MissingApiKey,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::ConnectionFailed { .. } => ErrorCode::ConnectionFailed,
            Error::ConnectionTimeout { .. } => ErrorCode::ConnectionTimeout,
            Error::RateLimited { .. } => ErrorCode::RateLimited,
            Error::Api { .. } => ErrorCode::ApiError,
            Error::MalformedResponse(_) => ErrorCode::MalformedResponse,

            Error::CrewParse { .. } => ErrorCode::CrewParseError,
            Error::CrewInvalid(_) => ErrorCode::CrewInvalid,
            Error::UnknownAgent { .. } => ErrorCode::UnknownAgent,
            Error::AgentNotInCrew { .. } => ErrorCode::AgentNotInCrew,
            Error::UnknownTool { .. } => ErrorCode::UnknownTool,

            Error::TaskFailed { .. } => ErrorCode::TaskFailed,
            Error::ToolFailed { .. } => ErrorCode::ToolFailed,
            Error::HumanInputClosed => ErrorCode::HumanInputClosed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ConnectionFailed { .. }
            | Error::ConnectionTimeout { .. }
            | Error::RateLimited { .. } => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error ends a crew run instead of becoming an observation.
    ///
    /// A closed terminal and language model failures abort; a tool can
    /// only raise the latter by running a co-worker.
    pub fn aborts_run(&self) -> bool {
        matches!(self, Error::HumanInputClosed) || (300..400).contains(&(self.code() as u16))
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'zencover-crew config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'zencover-crew config validate' to see details."
            ),
            Error::MissingApiKey { .. } => Some(
                "Set OPENAI_API_KEY in your environment or in a .env file next to the binary."
            ),

            Error::ConnectionFailed { .. } => Some(
                "Check your network connection and the configured base_url."
            ),
            Error::ConnectionTimeout { .. } => Some(
                "The provider is slow or unreachable. Increase 'timeout_secs' in the [llm] section."
            ),
            Error::RateLimited { .. } => Some(
                "The provider is throttling requests. Wait a moment or raise 'max_retries'."
            ),

            Error::CrewParse { .. } => Some(
                "Check the crew definition syntax. Run 'zencover-crew crew validate' to see details."
            ),
            Error::AgentNotInCrew { .. } => Some(
                "Add the agent to the [crew] agents list or bind the task to an enlisted agent."
            ),
            Error::UnknownTool { .. } => Some(
                "Available tools are 'search' and 'human'."
            ),

            Error::HumanInputClosed => Some(
                "The crew talks with a human client. Run it from an interactive terminal."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>, source: toml::de::Error) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a crew parse error
    pub fn crew_parse(message: impl Into<String>, source: toml::de::Error) -> Self {
        Error::CrewParse {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a tool failure
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Map a reqwest error onto the connection error variants
    pub fn from_http(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::ConnectionTimeout { url: url.to_string() }
        } else {
            Error::ConnectionFailed {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::ConnectionFailed.as_str(), "E300");
        assert_eq!(ErrorCode::AgentNotInCrew.as_str(), "E403");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::RateLimited.exit_code(), 30);
        assert_eq!(ErrorCode::UnknownTool.exit_code(), 40);
        assert_eq!(ErrorCode::TaskFailed.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_error_display() {
        let err = Error::AgentNotInCrew {
            task: "policy_pro".into(),
            agent: "web_scout".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("policy_pro"));
        assert!(msg.contains("web_scout"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::ConnectionTimeout { url: "u".into() }.is_retryable());
        assert!(Error::RateLimited { url: "u".into(), message: "slow".into() }.is_retryable());
        assert!(Error::Api { status: 503, message: "down".into() }.is_retryable());
        assert!(!Error::Api { status: 401, message: "bad key".into() }.is_retryable());
        assert!(!Error::HumanInputClosed.is_retryable());
    }

    #[test]
    fn test_errors_that_abort_a_run() {
        assert!(Error::HumanInputClosed.aborts_run());
        assert!(Error::Api { status: 500, message: "down".into() }.aborts_run());
        assert!(Error::ConnectionTimeout { url: "u".into() }.aborts_run());
        assert!(Error::MalformedResponse("no choices".into()).aborts_run());
        assert!(!Error::tool_failed("search", "status 503").aborts_run());
        assert!(!Error::Internal("x".into()).aborts_run());
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::MissingApiKey { base_url: "https://api.openai.com/v1".into() };
        assert!(err.suggestion().unwrap().contains("OPENAI_API_KEY"));

        assert!(Error::Internal("x".into()).suggestion().is_none());
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::ConfigNotFound { path: PathBuf::from("/test/zencover.toml") };
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::UnknownAgent { agent: "ghost".into() };
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E402]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
