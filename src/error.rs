/// Unified error type for the query engine
/// Categories follow where in the pipeline a failure happened
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Input errors: validator rejections, the operation is never attempted
    #[error("Invalid input: {message}")]
    Input {
        message: String,
        field: Option<String>,
    },

    /// Translation errors: completion transport or response parse failures
    #[error("Translation error: {message}")]
    Translation {
        message: String,
        context: Option<String>,
    },

    /// Connection errors: establishing or authenticating the backend session
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        endpoint: Option<String>,
    },

    /// Timeout errors: a search job exceeded its deadline
    #[error("Search timed out: {message}")]
    Timeout {
        message: String,
        search_id: Option<String>,
    },

    /// Execution errors: any other backend failure while running a search
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        status: Option<u16>,
        context: Option<String>,
    },

    /// Configuration errors: missing or inconsistent settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal errors: should never happen, indicates bug
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        context: Option<String>,
    },
}

impl EngineError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            field: None,
        }
    }

    pub fn input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation {
            message: message.into(),
            context: None,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            endpoint: None,
        }
    }

    pub fn connection_to(message: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            endpoint: Some(endpoint.into()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            search_id: None,
        }
    }

    pub fn timeout_for_job(message: impl Into<String>, search_id: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            search_id: Some(search_id.into()),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            status: None,
            context: None,
        }
    }

    pub fn execution_with_status(message: impl Into<String>, status: u16) -> Self {
        Self::Execution {
            message: message.into(),
            status: Some(status),
            context: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Translation { context: ctx, .. } => *ctx = Some(context.into()),
            Self::Execution { context: ctx, .. } => *ctx = Some(context.into()),
            Self::Internal { context: ctx, .. } => *ctx = Some(context.into()),
            _ => {}
        }
        self
    }

    /// True when the backend session should be dropped and re-established
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: format!("{:#}", err),
            context: None,
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
                endpoint: err.url().map(|u| u.to_string()),
            }
        } else {
            Self::Execution {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
                context: None,
            }
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::translation(err.to_string())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
