//! Error types for Proxy Fetcher
//!
//! Errors are grouped per component. Per-item failures (remote, network, local I/O) are
//! contained where they happen and turned into log lines or failure records; only
//! configuration and startup errors travel all the way up to `main`.

use std::path::PathBuf;
use thiserror::Error;

/// Request signing errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// The shared secret could not be used as an HMAC key
    #[error("Invalid HMAC key: {reason}")]
    InvalidKey { reason: String },

    /// A computed header value contained bytes HTTP does not allow
    #[error("Invalid value for header {header}")]
    InvalidHeaderValue { header: &'static str },
}

/// Errors talking to the archive service
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Server answered with an unexpected status
    #[error("Archive returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// Connection-level failure
    #[error("Network error talking to the archive")]
    Network(#[from] reqwest::Error),

    /// A response that should be structured could not be decoded
    #[error("Could not decode {context}: {reason}")]
    Decode { context: String, reason: String },

    /// A URL could not be built or parsed
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// The request could not be signed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Retrying did not help
    #[error("Maximum retry attempts ({max_retries}) exceeded")]
    RetriesExhausted { max_retries: u32 },

    /// The client was configured with values it cannot work with
    #[error("Invalid client configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ArchiveError {
    /// Build a decode error from any displayable cause
    pub fn decode(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ArchiveError::Remote { status, .. } => Some(*status),
            ArchiveError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Proxy download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned error status for the proxy content
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive did not provide a playable URL
    #[error("No download URL available for {content_id}")]
    NoDownloadUrl { content_id: String },

    /// Download timeout
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Every candidate file name was taken
    #[error("No free file name found after {attempts} attempts")]
    NamingExhausted { attempts: u32 },

    /// The item does not map to a usable local path
    #[error("Cannot derive a download path: {reason}")]
    InvalidDestination { reason: String },

    /// Processing panicked
    #[error("Processing panicked: {message}")]
    Panicked { message: String },
}

/// Input list errors
#[derive(Error, Debug)]
pub enum ListError {
    /// List file not found
    #[error("List file not found: {path}")]
    NotFound { path: PathBuf },

    /// I/O error reading the list
    #[error("I/O error reading list")]
    Io(#[from] std::io::Error),

    /// An ignore pattern is not a valid regular expression
    #[error("Invalid ignore pattern {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Work queue errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Every worker has exited, nothing will ever dequeue
    #[error("No workers are left to consume the queue")]
    NoConsumers,

    /// The receiving side was dropped
    #[error("Work queue closed")]
    Closed,
}

/// Result log errors
#[derive(Error, Debug)]
pub enum WriterError {
    /// The log could not be opened
    #[error("Cannot open result log {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the log failed
    #[error("Result log I/O error")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized
    #[error("Result log serialization error")]
    Csv(#[from] csv::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Missing required configuration field
    #[error("Missing required configuration: {field}")]
    MissingField { field: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Signing error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Archive error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Input list error
    #[error(transparent)]
    List(#[from] ListError),

    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Result log error
    #[error(transparent)]
    Writer(#[from] WriterError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is transient and the same call could succeed later
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Archive(ArchiveError::Network(_))
            | AppError::Archive(ArchiveError::RetriesExhausted { .. })
            | AppError::Download(DownloadError::Http(_))
            | AppError::Download(DownloadError::Timeout { .. }) => true,
            AppError::Archive(ArchiveError::Remote { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "signing",
            AppError::Archive(_) => "archive",
            AppError::Download(_) => "download",
            AppError::List(_) => "list",
            AppError::Queue(_) => "queue",
            AppError::Writer(_) => "result-log",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Signing result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Archive result type alias
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// List result type alias
pub type ListResult<T> = std::result::Result<T, ListError>;

/// Queue result type alias
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Writer result type alias
pub type WriterResult<T> = std::result::Result<T, WriterError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
