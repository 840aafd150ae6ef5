//! Identity provider port definition.
//!
//! The port is the only way the gateway talks to the identity provider
//! client. Adapters wrap a concrete client (platform SDK, stub) and own
//! the token cache, protocol flows, and sign-in UI.

use async_trait::async_trait;
use identity_domain::{Account, AuthenticationResult, PresentationContext};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IdentityError;

// =============================================================================
// Identity Provider Port
// =============================================================================

/// Port for the identity provider client.
///
/// Implementations:
/// - `StubIdentityProvider` - In-memory cache with scripted outcomes
#[async_trait]
pub trait IdentityProviderPort: Send + Sync {
    /// List accounts in the provider's cache.
    ///
    /// Order is whatever the cache enumerates; callers may only rely on it
    /// being stable between two consecutive calls with no mutation.
    async fn list_cached_accounts(&self) -> Result<Vec<Account>, IdentityError>;

    /// Acquire a token without user interaction.
    ///
    /// # Arguments
    ///
    /// * `scopes` - API scopes to request
    /// * `account` - Cached account to refresh
    /// * `authority` - Policy authority URL
    ///
    /// # Returns
    ///
    /// `SilentAcquisition::InteractionRequired` when the cached session can
    /// not be used silently. That outcome is not an error.
    async fn acquire_token_silently(
        &self,
        scopes: &[String],
        account: &Account,
        authority: &str,
    ) -> Result<SilentAcquisition, IdentityError>;

    /// Acquire a token by presenting sign-in UI.
    ///
    /// # Arguments
    ///
    /// * `scopes` - API scopes to request
    /// * `account_hint` - Cached account to pre-select, if any
    /// * `context` - Parent window/activity for the UI, if any
    async fn acquire_token_interactively(
        &self,
        scopes: &[String],
        account_hint: Option<&Account>,
        context: Option<&PresentationContext>,
    ) -> Result<AuthenticationResult, IdentityError>;

    /// Remove an account from the provider's cache.
    async fn remove_account(&self, account: &Account) -> Result<(), IdentityError>;
}

// =============================================================================
// Silent Acquisition
// =============================================================================

/// Outcome of a silent acquisition that did not fail.
#[derive(Debug, Clone)]
pub enum SilentAcquisition {
    /// Token acquired from the cached session
    Acquired(AuthenticationResult),
    /// The user has to interact before a token can be issued
    InteractionRequired(InteractionReason),
}

/// Why silent acquisition needs the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionReason {
    /// No cached account for the configured policy
    NoCachedAccount,
    /// Cached account has no usable session
    NoValidSession,
    /// User must consent to the requested scopes
    ConsentRequired,
    /// Refresh token expired or was revoked
    RefreshTokenExpired,
}

impl fmt::Display for InteractionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionReason::NoCachedAccount => write!(f, "no_cached_account"),
            InteractionReason::NoValidSession => write!(f, "no_valid_session"),
            InteractionReason::ConsentRequired => write!(f, "consent_required"),
            InteractionReason::RefreshTokenExpired => write!(f, "refresh_token_expired"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
