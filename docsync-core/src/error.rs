//! Error taxonomy for a synchronisation run.
//!
//! Every per-item failure is recoverable: the item is logged and abandoned for the run.
//! Only [`ConfigError`] (collection reconciliation) and a failed tag ensure are fatal to a stage.
//! A missing remote record is not an error at all, see [`crate::contract::Lookup::NotFound`].

use thiserror::Error;

/// Missing or malformed front matter. The document is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field(s) {}", .0.join(","))]
    MissingFields(Vec<String>),

    #[error("Slug `{0}` contains invalid special character. Slugs should contain letters, digits and hyphens only, e.g. example-doc-name")]
    InvalidSlug(String),

    #[error("Order `{0}` is not an integer")]
    InvalidOrder(String),

    #[error("uuid `{0}` is not a valid UUID")]
    InvalidUuid(String),

    #[error("Please provide a uuid in the front matter")]
    MissingUuid,
}

/// The document's uuid contradicts the uuid stored on the remote record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Attempted to update entry `{ref_id}` whose uuid `{remote}` does not match provided uuid `{local}`")]
pub struct IdentityConflictError {
    pub ref_id: String,
    pub remote: String,
    pub local: String,
}

/// Malformed run settings or collection config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Collection config `{0}` could not be read")]
    Missing(String),

    #[error("Failed to parse collection config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Collection config has no `collections` mapping")]
    NoCollections,

    #[error("Collection id must be a string, got {0}")]
    InvalidId(String),

    #[error("Collection `{0}` is missing a title")]
    MissingTitle(String),

    #[error("Collection `{0}` must list at least one slug")]
    MissingSlugs(String),

    #[error("Repository `{0}` must have the form org/repo")]
    InvalidRepository(String),
}

/// Any failure talking to the CMS other than a clean not-found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    IdentityConflict(#[from] IdentityConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
