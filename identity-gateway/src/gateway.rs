//! IdentityGateway: session lifecycle over the identity provider port.
//!
//! The gateway owns the configured provider client, the current session,
//! and the rule for picking the cached account that belongs to the
//! configured policy.
//!
//! # Flow
//!
//! ```text
//! interactively_sign_in ─► silent attempt ─► SignedIn?  ─► done (no UI)
//!                                 │
//!                                 └─ InteractionRequired ─► sign-in UI ─► SignedIn
//!
//! sign_out ─► list ─► remove one ─► list ─► ... ─► empty ─► SignedOut
//! ```
//!
//! # Concurrency
//!
//! All four operations are serialised per gateway by one async mutex, so a
//! sign-out can never interleave with a sign-in. Session reads take only
//! the state lock and do not wait for provider I/O.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use identity_domain::{Account, AuthenticatedUser, AuthenticationResult, PresentationContext};

use crate::config::{GatewayOptions, IdentityConfig};
use crate::error::{IdentityError, IdentityResult};
use crate::events::{SessionEvent, SessionEventBus, SessionEventReceiver};
use crate::ports::{IdentityProviderPort, InteractionReason, SilentAcquisition};
use crate::reporting::ErrorReporter;
use crate::session::{SessionSnapshot, SessionState};

// =============================================================================
// Outcomes
// =============================================================================

/// Outcome of `silently_sign_in` when the provider did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilentOutcome {
    /// Token acquired; session established or refreshed
    SignedIn,
    /// No silent path; session left as it was
    InteractionRequired {
        /// Why the user has to interact
        reason: InteractionReason,
    },
}

/// Outcome of `interactively_sign_in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// A session was already available after the silent attempt; no UI shown
    AlreadySignedIn,
    /// Sign-in UI completed and a session was established
    SignedIn,
    /// Sign-in failed; the error was reported and the session is unchanged
    Failed(IdentityError),
}

impl SignInOutcome {
    /// Whether the call ended without error.
    ///
    /// `Failed` does not imply signed out: a session from an earlier
    /// acquisition is kept. Use `IdentityGateway::is_authenticated` for
    /// the session itself.
    pub fn succeeded(&self) -> bool {
        !matches!(self, SignInOutcome::Failed(_))
    }
}

/// How a sign-out ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// Cache drained and session cleared
    Completed,
    /// Drain stopped; the error was reported and the session is unchanged
    Failed(IdentityError),
}

/// Result of `sign_out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutReport {
    /// Accounts removed before the drain ended
    pub removed: usize,
    /// How the drain ended
    pub outcome: SignOutOutcome,
}

impl SignOutReport {
    /// Whether the session was cleared.
    pub fn is_completed(&self) -> bool {
        self.outcome == SignOutOutcome::Completed
    }
}

// =============================================================================
// Identity Gateway
// =============================================================================

/// Single logical identity session over one provider client.
pub struct IdentityGateway {
    /// Provider configuration
    config: IdentityConfig,
    /// Removal pass limit for sign-out
    max_sign_out_passes: usize,
    /// Identity provider client
    provider: Arc<dyn IdentityProviderPort>,
    /// Sink for failures not returned to callers
    reporter: Arc<dyn ErrorReporter>,
    /// Session fields
    state: RwLock<SessionState>,
    /// Context for interactive sign-in when the caller passes none
    default_context: RwLock<Option<PresentationContext>>,
    /// Serialises the lifecycle operations
    operation_lock: Mutex<()>,
    /// Session transition notifications
    events: SessionEventBus,
}

impl IdentityGateway {
    /// Create a gateway with default options.
    ///
    /// # Errors
    /// Returns `IdentityError::Config` if the configuration is invalid.
    pub fn new(
        config: IdentityConfig,
        provider: Arc<dyn IdentityProviderPort>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> IdentityResult<Self> {
        Self::with_options(config, GatewayOptions::default(), provider, reporter)
    }

    /// Create a gateway with explicit options.
    pub fn with_options(
        config: IdentityConfig,
        options: GatewayOptions,
        provider: Arc<dyn IdentityProviderPort>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> IdentityResult<Self> {
        config.validate()?;
        if options.max_sign_out_passes == 0 {
            return Err(IdentityError::Config(
                "max_sign_out_passes must be at least 1".to_string(),
            ));
        }

        info!(
            authority = %config.authority(),
            client_id = %config.client_id,
            scopes = config.scopes.len(),
            "Identity gateway configured"
        );

        Ok(Self {
            config,
            max_sign_out_passes: options.max_sign_out_passes,
            provider,
            reporter,
            state: RwLock::new(SessionState::default()),
            default_context: RwLock::new(options.default_presentation_context),
            operation_lock: Mutex::new(()),
            events: SessionEventBus::new(options.event_capacity),
        })
    }

    // -------------------------------------------------------------------------
    // Session accessors
    // -------------------------------------------------------------------------

    /// Provider configuration.
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Whether a session is established.
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    /// User derived from the most recent acquisition.
    ///
    /// Still returned after sign-out (last-known user).
    pub async fn authenticated_user(&self) -> Option<AuthenticatedUser> {
        self.state.read().await.authenticated_user().cloned()
    }

    /// Most recent acquisition; `None` after sign-out.
    pub async fn last_authentication_result(&self) -> Option<AuthenticationResult> {
        self.state.read().await.last_authentication_result().cloned()
    }

    /// Consistent copy of all session fields.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    /// Subscribe to session transitions.
    pub fn subscribe(&self) -> SessionEventReceiver {
        self.events.subscribe()
    }

    /// Replace the context used when `interactively_sign_in` gets none.
    pub async fn set_default_presentation_context(&self, context: Option<PresentationContext>) {
        *self.default_context.write().await = context;
    }

    /// Context used when `interactively_sign_in` gets none.
    pub async fn default_presentation_context(&self) -> Option<PresentationContext> {
        self.default_context.read().await.clone()
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Find the first cached account issued for `policy`.
    ///
    /// First match in cache enumeration order wins. An empty cache or no
    /// match is `Ok(None)`; only a failure to read the cache is an error.
    pub async fn find_account_for_policy(&self, policy: &str) -> IdentityResult<Option<Account>> {
        let accounts = self.provider.list_cached_accounts().await?;
        let total = accounts.len();

        let found = accounts.into_iter().find(|account| account.matches_policy(policy));
        debug!(policy, cached = total, found = found.is_some(), "Account lookup");

        Ok(found)
    }

    /// Acquire a token for the configured policy without user interaction.
    ///
    /// `InteractionRequired` is an expected outcome and leaves the session
    /// untouched. Any other provider failure is returned as `Err`.
    #[instrument(skip(self), fields(policy = %self.config.policy))]
    pub async fn silently_sign_in(&self) -> IdentityResult<SilentOutcome> {
        let _guard = self.operation_lock.lock().await;
        self.silent_attempt().await
    }

    /// Sign in, showing UI only when no session can be obtained silently.
    ///
    /// The silent attempt always completes before any UI is shown. If a
    /// session exists afterwards, no UI is shown. Otherwise the sign-in UI
    /// is attached to `context`, or to the default context if `None`.
    ///
    /// Failures are reported to the error sink and returned as
    /// `SignInOutcome::Failed`; the session is never cleared here.
    #[instrument(skip(self, context), fields(policy = %self.config.policy))]
    pub async fn interactively_sign_in(&self, context: Option<PresentationContext>) -> SignInOutcome {
        let _guard = self.operation_lock.lock().await;

        match self.silent_attempt().await {
            Ok(SilentOutcome::SignedIn) => return SignInOutcome::AlreadySignedIn,
            Ok(SilentOutcome::InteractionRequired { .. }) => {}
            Err(e) => return self.sign_in_failed(e),
        }

        if self.is_authenticated().await {
            debug!("Existing session kept, skipping sign-in UI");
            return SignInOutcome::AlreadySignedIn;
        }

        let context = match context {
            Some(context) => Some(context),
            None => self.default_presentation_context().await,
        };

        let account_hint = match self.find_account_for_policy(&self.config.policy).await {
            Ok(account) => account,
            Err(e) => return self.sign_in_failed(e),
        };

        info!(
            context = context.as_ref().map(PresentationContext::handle),
            hint = account_hint.is_some(),
            "Presenting sign-in UI"
        );

        let result = match self
            .provider
            .acquire_token_interactively(&self.config.scopes, account_hint.as_ref(), context.as_ref())
            .await
        {
            Ok(result) => result,
            Err(e) => return self.sign_in_failed(e),
        };

        match self.establish(result, true).await {
            Ok(()) => SignInOutcome::SignedIn,
            Err(e) => self.sign_in_failed(e),
        }
    }

    /// Remove every cached account, then clear the session.
    ///
    /// Accounts are removed one at a time, re-listing the cache after each
    /// removal, until the cache is empty. The drain stops on the first
    /// failure or after `max_sign_out_passes` removals; in both cases the
    /// error is reported and the session is left as it was.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> SignOutReport {
        let _guard = self.operation_lock.lock().await;

        let mut removed = 0;
        if let Err(e) = self.drain_account_cache(&mut removed).await {
            error!(error = %e, removed, "Sign-out failed");
            self.reporter.report(&e);
            return SignOutReport {
                removed,
                outcome: SignOutOutcome::Failed(e),
            };
        }

        self.state.write().await.sign_out();
        self.events.send(SessionEvent::SignedOut {
            removed,
            timestamp: Utc::now(),
        });
        info!(removed, "Signed out");

        SignOutReport {
            removed,
            outcome: SignOutOutcome::Completed,
        }
    }

    // -------------------------------------------------------------------------
    // Internals (operation lock held by caller)
    // -------------------------------------------------------------------------

    async fn silent_attempt(&self) -> IdentityResult<SilentOutcome> {
        let Some(account) = self.find_account_for_policy(&self.config.policy).await? else {
            warn!("No cached account for policy, interaction required");
            return Ok(SilentOutcome::InteractionRequired {
                reason: InteractionReason::NoCachedAccount,
            });
        };

        debug!(account = %account.home_account_id, "Acquiring token silently");
        let acquisition = self
            .provider
            .acquire_token_silently(&self.config.scopes, &account, &self.config.authority())
            .await
            .map_err(|e| {
                error!(error = %e, "Silent acquisition failed");
                e
            })?;

        match acquisition {
            SilentAcquisition::Acquired(result) => {
                self.establish(result, false).await?;
                Ok(SilentOutcome::SignedIn)
            }
            SilentAcquisition::InteractionRequired(reason) => {
                warn!(%reason, "Silent acquisition needs interaction");
                Ok(SilentOutcome::InteractionRequired { reason })
            }
        }
    }

    /// Derive the user from `result` and install both as the session.
    ///
    /// Nothing is written if the identity token cannot be decoded.
    async fn establish(&self, result: AuthenticationResult, interactive: bool) -> IdentityResult<()> {
        let user = AuthenticatedUser::from_id_token(&result.id_token)?;
        let object_id = user.object_id.clone();

        let was_authenticated = {
            let mut state = self.state.write().await;
            let was_authenticated = state.is_authenticated();
            state.establish(result, user);
            was_authenticated
        };

        let timestamp = Utc::now();
        let event = if was_authenticated && !interactive {
            info!(%object_id, "Session refreshed");
            SessionEvent::Refreshed {
                object_id,
                timestamp,
            }
        } else {
            info!(%object_id, interactive, "Signed in");
            SessionEvent::SignedIn {
                object_id,
                interactive,
                timestamp,
            }
        };
        self.events.send(event);

        Ok(())
    }

    fn sign_in_failed(&self, error: IdentityError) -> SignInOutcome {
        error!(error = %error, "Interactive sign-in failed");
        self.reporter.report(&error);
        self.events.send(SessionEvent::SignInFailed {
            message: error.to_string(),
            timestamp: Utc::now(),
        });
        SignInOutcome::Failed(error)
    }

    async fn drain_account_cache(&self, removed: &mut usize) -> IdentityResult<()> {
        let mut accounts = self.provider.list_cached_accounts().await?;

        loop {
            let Some(account) = accounts.into_iter().next() else {
                return Ok(());
            };

            if *removed >= self.max_sign_out_passes {
                return Err(IdentityError::SignOutIncomplete { passes: *removed });
            }

            debug!(account = %account.home_account_id, "Removing cached account");
            self.provider.remove_account(&account).await?;
            *removed += 1;

            accounts = self.provider.list_cached_accounts().await?;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
