//! Identity gateway error types.

use identity_domain::DomainError;
use thiserror::Error;

/// Errors that can occur during identity operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Identity provider client failure (network, cache, protocol)
    #[error("Provider error: {0}")]
    Provider(String),

    /// User dismissed the interactive sign-in UI
    #[error("Sign-in cancelled by user")]
    Cancelled,

    /// Acquired token could not be turned into a user view
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] DomainError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Account cache was still populated after the pass limit
    #[error("Sign-out incomplete: accounts remained after {passes} removal passes")]
    SignOutIncomplete {
        /// Removal passes performed before giving up
        passes: usize,
    },

    /// Shared gateway requested before installation
    #[error("Identity gateway not initialized")]
    NotInitialized,

    /// Shared gateway installed twice
    #[error("Identity gateway already initialized")]
    AlreadyInitialized,
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;
