use std::path::PathBuf;

/// Failure classes surfaced by plan generation.
///
/// Every failure of the core lands in exactly one of these kinds; the
/// request handler maps the kind to an external status signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The service is not deployable as configured (credential, endpoint, timeout).
    Configuration,
    /// The model answered, but not with a valid plan.
    Generation,
    /// Anything else.
    Unexpected,
}

impl ErrorKind {
    /// HTTP-style status for the request handler.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Configuration => 503,
            ErrorKind::Generation | ErrorKind::Unexpected => 500,
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Configuration => 3,
            ErrorKind::Generation => 2,
            ErrorKind::Unexpected => 1,
        }
    }

    /// Prefix of the `detail` message returned to callers.
    pub fn detail_prefix(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Service Configuration Error",
            ErrorKind::Generation => "LLM Output Error",
            ErrorKind::Unexpected => "An unexpected server error occurred",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("{detail}")]
    Config { detail: String },

    /// The raw model output is kept so it can be logged; it is never
    /// echoed back to the caller.
    #[error("AI planning failed to produce a valid plan ({detail}). Try a different prompt.")]
    Generation {
        detail: String,
        raw_response: Option<String>,
    },

    #[error("{detail}")]
    Unexpected { detail: String },
}

impl PlanError {
    pub fn config(detail: impl Into<String>) -> Self {
        PlanError::Config {
            detail: detail.into(),
        }
    }

    pub fn generation(detail: impl Into<String>, raw_response: Option<&str>) -> Self {
        PlanError::Generation {
            detail: detail.into(),
            raw_response: raw_response.map(str::to_owned),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        PlanError::Unexpected {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::Config { .. } => ErrorKind::Configuration,
            PlanError::Generation { .. } => ErrorKind::Generation,
            PlanError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PlanError::Generation { raw_response, .. } => raw_response.as_deref(),
            _ => None,
        }
    }
}

/// Rejected inbound request. Not a core failure: the goal never reached
/// the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidGoal {
    #[error("goal_text must not be empty")]
    Empty,

    #[error("request body is not a valid goal request: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {detail}")]
    FileRead { path: PathBuf, detail: String },

    #[error("failed to parse config file {path}: {detail}")]
    FileParse { path: PathBuf, detail: String },

    #[error("Failed to parse environment variable '{var}': {detail}")]
    EnvParse { var: String, detail: String },

    #[error("invalid {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}

impl From<ConfigError> for PlanError {
    fn from(e: ConfigError) -> Self {
        PlanError::config(e.to_string())
    }
}
