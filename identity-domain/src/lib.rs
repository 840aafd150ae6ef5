//! Tailwind Identity Domain Layer
//!
//! Pure identity types with zero I/O dependencies: cached accounts,
//! acquired tokens, and the user view derived from an identity token.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod account;
pub mod context;
pub mod error;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use account::{Account, HomeAccountId};
pub use context::PresentationContext;
pub use error::DomainError;
pub use token::{AccessToken, AuthenticationResult, IdToken, IdTokenClaims};
pub use user::AuthenticatedUser;
