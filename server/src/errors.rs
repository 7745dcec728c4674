use crate::extractor::ExtractError;
use crate::resolver::ResolveError;
use hyper::StatusCode;
use std::{error::Error, fmt};

#[derive(Debug)]
pub enum GatewayError {
    ConfigError(String),
    NetworkError(String),
    /// Malformed request: bad JSON body or a URL that is not a recognized
    /// video URL.
    InvalidInput(String),
    /// Video unavailable, or no variant matches the selection policy.
    NotFound(String),
    /// Extractor or relay failure. `stale` marks the case where the
    /// extractor's knowledge of the platform no longer matches reality.
    Upstream { message: String, stale: bool },
}

impl GatewayError {
    pub fn upstream(message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            message: message.into(),
            stale: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ConfigError(_)
            | GatewayError::NetworkError(_)
            | GatewayError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            GatewayError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            GatewayError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            GatewayError::NotFound(msg) => write!(f, "Not found: {}", msg),
            GatewayError::Upstream { message, stale } => {
                if *stale {
                    write!(f, "Upstream failure (extractor logic is stale): {}", message)
                } else {
                    write!(f, "Upstream failure: {}", message)
                }
            }
        }
    }
}

impl Error for GatewayError {}

impl From<ResolveError> for GatewayError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound => GatewayError::NotFound("no matching format".to_string()),
            // Duplicate itags mean the upstream catalogue is broken, not
            // that the client asked for something absent.
            ResolveError::DuplicateItag(_) => GatewayError::upstream(e.to_string()),
        }
    }
}

impl From<ExtractError> for GatewayError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Unavailable(msg) => GatewayError::NotFound(msg),
            ExtractError::Stale(msg) => GatewayError::Upstream {
                message: msg,
                stale: true,
            },
            ExtractError::Timeout
            | ExtractError::Tool(_)
            | ExtractError::Parse(_)
            | ExtractError::Failed(_) => GatewayError::upstream(e.to_string()),
        }
    }
}
