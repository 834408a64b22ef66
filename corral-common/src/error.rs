//! Shared error type for the Corral backend

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures the repository and config layers can surface.
///
/// The HTTP layer in corral-api maps these onto status codes; here they only
/// classify the failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Any sqlx failure: schema init, session/conversation/lead queries
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure, mostly chunk staging and artifact assembly
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Root-folder or config-file resolution failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lookup by id or contact came up empty
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied value rejected before any write (missing task title,
    /// bad chunk count)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invariant breakage with no better classification
    #[error("Internal error: {0}")]
    Internal(String),
}
