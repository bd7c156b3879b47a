//! Error types for ryx

use std::sync::Arc;
use thiserror::Error;

/// Main error type for ryx operations
#[derive(Debug, Error)]
pub enum RyxError {
    #[error("Cannot locate signature transform: {0}")]
    TransformLocationFailed(String),

    #[error("Signature transform invocation failed: {0}")]
    TransformInvocationFailed(String),

    #[error("Script execution engine unavailable: {0}")]
    ExecutionEngineUnavailable(String),

    #[error("Player info unobtainable: {0}")]
    PlayerInfoUnobtainable(String),

    #[error("Invalid video identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Player response unparsable: {0}")]
    PayloadUnparsable(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    /// Transport failure carried as text, for errors shared between cache waiters
    #[error("Fetch failed: {0}")]
    Transport(String),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl RyxError {
    /// Check if error comes from locating, building or running a signature transform
    pub fn is_cipher_error(&self) -> bool {
        matches!(
            self,
            RyxError::TransformLocationFailed(_)
                | RyxError::TransformInvocationFailed(_)
                | RyxError::ExecutionEngineUnavailable(_)
        )
    }

    /// Check if error comes from the transport
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            RyxError::FetchFailed(_) | RyxError::Transport(_) | RyxError::HttpStatus { .. }
        )
    }

    /// Recover an owned error from one shared by concurrent cache waiters.
    ///
    /// The sole owner gets the original back; other waiters get a copy of the
    /// same kind. Transport errors stay transport errors (an HTTP status is
    /// kept as such) and parse errors are flattened to their message.
    pub fn from_shared(shared: Arc<RyxError>) -> RyxError {
        match Arc::try_unwrap(shared) {
            Ok(error) => error,
            Err(shared) => match shared.as_ref() {
                RyxError::TransformLocationFailed(m) => RyxError::TransformLocationFailed(m.clone()),
                RyxError::TransformInvocationFailed(m) => {
                    RyxError::TransformInvocationFailed(m.clone())
                }
                RyxError::ExecutionEngineUnavailable(m) => {
                    RyxError::ExecutionEngineUnavailable(m.clone())
                }
                RyxError::PlayerInfoUnobtainable(m) => RyxError::PlayerInfoUnobtainable(m.clone()),
                RyxError::InvalidIdentifier(m) => RyxError::InvalidIdentifier(m.clone()),
                RyxError::PayloadUnparsable(m) => RyxError::PayloadUnparsable(m.clone()),
                RyxError::HttpStatus { status, url } => RyxError::HttpStatus {
                    status: *status,
                    url: url.clone(),
                },
                RyxError::FetchFailed(e) => match e.status() {
                    Some(status) => RyxError::HttpStatus {
                        status: status.as_u16(),
                        url: e.url().map(|u| u.to_string()).unwrap_or_default(),
                    },
                    None => RyxError::Transport(e.to_string()),
                },
                RyxError::Transport(m) => RyxError::Transport(m.clone()),
                other => RyxError::Generic(other.to_string()),
            },
        }
    }
}
