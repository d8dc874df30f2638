//! Crate-level error type

use crate::config::ConfigError;
use crate::dimensions::ResolveError;
use crate::metadata::MetadataError;
use crate::normalize::NormalizeError;
use crate::query::QueryError;
use crate::transport::TransportError;

/// Errors from the public client calls
#[derive(Debug, thiserror::Error)]
pub enum ImfError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport error
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Dimension resolution error
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Query validation error
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Normalization error
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Metadata error
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Dataset catalog could not be parsed
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl ImfError {
    /// Whether the caller's input was rejected before any data request
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Query(_)
                | Self::Resolve(ResolveError::InvalidDatasetId(_))
                | Self::Metadata(MetadataError::MissingUrl)
        )
    }

    /// Whether the query ran but matched no series
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Normalize(NormalizeError::EmptyResult))
    }

    /// Underlying transport error, wherever it was raised
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e)
            | Self::Resolve(ResolveError::Transport(e))
            | Self::Resolve(ResolveError::UnknownDataset { source: e, .. })
            | Self::Metadata(MetadataError::Transport(e)) => Some(e),
            _ => None,
        }
    }
}

/// Result type for client calls
pub type ImfResult<T> = Result<T, ImfError>;
