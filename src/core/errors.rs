//! GLS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, GlsError>;

/// Top-level error type for glsched.
#[derive(Debug, Error)]
pub enum GlsError {
    #[error("[GLS-1001] invalid profile: {details}")]
    InvalidProfile { details: String },

    #[error("[GLS-1002] invalid project URL: {details}")]
    InvalidProjectUrl { details: String },

    #[error("[GLS-1003] profile store parse failure in {path}: {details}")]
    ProfileParse { path: PathBuf, details: String },

    #[error("[GLS-1101] invalid cron expression: {details}")]
    InvalidCron { details: String },

    #[error("[GLS-2001] API request failed: {details}")]
    ApiRequest { details: String },

    #[error("[GLS-2002] API returned {status} for {operation}: {body}")]
    ApiStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("[GLS-2003] API response decode failure in {operation}: {details}")]
    ApiDecode {
        operation: &'static str,
        details: String,
    },

    #[error("[GLS-2004] no project connected")]
    NotConnected,

    #[error("[GLS-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[GLS-3001] profile index {index} out of range (have {len})")]
    ProfileIndex { index: usize, len: usize },

    #[error("[GLS-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[GLS-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[GLS-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl GlsError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidProfile { .. } => "GLS-1001",
            Self::InvalidProjectUrl { .. } => "GLS-1002",
            Self::ProfileParse { .. } => "GLS-1003",
            Self::InvalidCron { .. } => "GLS-1101",
            Self::ApiRequest { .. } => "GLS-2001",
            Self::ApiStatus { .. } => "GLS-2002",
            Self::ApiDecode { .. } => "GLS-2003",
            Self::NotConnected => "GLS-2004",
            Self::Serialization { .. } => "GLS-2101",
            Self::ProfileIndex { .. } => "GLS-3001",
            Self::Io { .. } => "GLS-3002",
            Self::ChannelClosed { .. } => "GLS-3003",
            Self::Runtime { .. } => "GLS-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ApiRequest { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for GlsError {
    fn from(value: reqwest::Error) -> Self {
        Self::ApiRequest {
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for GlsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for GlsError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
