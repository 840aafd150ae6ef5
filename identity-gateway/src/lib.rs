//! Tailwind Identity Gateway
//!
//! Session lifecycle over a policy-based identity provider client.
//!
//! # Architecture
//!
//! ```text
//! Caller → IdentityGateway → IdentityProviderPort → (token cache, network, UI)
//!                 │
//!                 ├── SessionState (IsAuthenticated / user / last result)
//!                 ├── ErrorReporter (out-of-band failure sink)
//!                 └── SessionEventBus (transition notifications)
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits for the provider client and the error sink
//! - **Gateway**: Silent-then-interactive sign-in and cache-draining sign-out
//! - **Shared**: Process-wide, initialise-once gateway instance
//! - **Stub**: In-memory provider for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use identity_gateway::{IdentityConfig, IdentityGateway, StubIdentityProvider, TracingErrorReporter};
//! use std::sync::Arc;
//!
//! let config = IdentityConfig::from_env()?;
//! let provider = Arc::new(StubIdentityProvider::new(&config));
//! let gateway = IdentityGateway::new(config, provider, Arc::new(TracingErrorReporter))?;
//!
//! match gateway.interactively_sign_in(None).await {
//!     SignInOutcome::Failed(error) => eprintln!("sign-in failed: {error}"),
//!     _ => println!("signed in: {:?}", gateway.authenticated_user().await),
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod ports;
pub mod reporting;
pub mod session;
pub mod shared;
pub mod stub;

// Re-exports for convenience
pub use config::{GatewayOptions, IdentityConfig};
pub use error::{IdentityError, IdentityResult};
pub use events::{SessionEvent, SessionEventBus, SessionEventReceiver};
pub use gateway::{IdentityGateway, SignInOutcome, SignOutOutcome, SignOutReport, SilentOutcome};
pub use ports::{IdentityProviderPort, InteractionReason, SilentAcquisition};
pub use reporting::{ErrorReporter, TracingErrorReporter};
pub use session::{SessionSnapshot, SessionStatus};
pub use stub::{
    IdTokenBuilder, InteractiveCall, RecordingErrorReporter, StubIdentityProvider,
    StubInteractiveBehavior, StubSilentBehavior, StubUser,
};

pub use identity_domain::{
    Account, AccessToken, AuthenticatedUser, AuthenticationResult, DomainError, HomeAccountId,
    IdToken, IdTokenClaims, PresentationContext,
};
