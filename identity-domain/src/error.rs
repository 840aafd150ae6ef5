//! Domain error types.

/// Domain errors for identity value validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Identity token could not be decoded
    #[error("Invalid id token: {0}")]
    InvalidIdToken(String),

    /// A claim required to build the user view is absent
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// Home account identifier is malformed
    #[error("Invalid home account id: {0}")]
    InvalidAccountId(String),
}
