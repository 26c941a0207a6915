//! Unified error handling.
//!
//! The origin engine itself is infallible; every variant here belongs to the
//! surrounding application: configuration, the mail/identity collaborators,
//! local input files and rendering.
//!
//! Categories are coarse on purpose so the CLI can map them to exit codes
//! and the retry layer can decide what is transient:
//!   - Input: user / configuration problems
//!   - Auth: rejected or missing credentials
//!   - Network: transport failures (retryable)
//!   - Parse: undecodable payloads or files
//!   - Internal: I/O and unexpected states

use std::io;

use thiserror::Error;

/// High-level classification for reporting and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Auth,
    Network,
    Parse,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Network => "network",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum SpamOriginError {
    // ------------------------ Input / Validation ----------------------------
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ------------------------------ Auth ------------------------------------
    #[error("Authentication failed for {service}: {reason}")]
    Auth { service: String, reason: String },

    // ----------------------------- Network ----------------------------------
    #[error("Transport error during {operation}: {reason}")]
    Transport {
        operation: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ---------------------------- Parsing -----------------------------------
    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SpamOriginError {
    pub fn category(&self) -> ErrorCategory {
        use SpamOriginError::*;
        match self {
            Configuration { .. } => ErrorCategory::Input,
            Auth { .. } => ErrorCategory::Auth,
            Transport { .. } => ErrorCategory::Network,
            Parse { .. } => ErrorCategory::Parse,
            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }

    // ---------------------------- Constructors -----------------------------

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn auth(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub fn transport_with(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source = source.into();
        Self::Transport {
            operation: operation.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub fn parse(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, SpamOriginError>;

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| SpamOriginError::io(path.into(), operation.into(), e))
    }
}
