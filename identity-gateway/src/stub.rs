//! Stub implementations for testing.
//!
//! These implementations simulate the identity provider client and the
//! error sink without a token cache, network, or UI.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use identity_domain::{
    AccessToken, Account, AuthenticationResult, HomeAccountId, IdToken, IdTokenClaims,
    PresentationContext,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::ports::{IdentityProviderPort, InteractionReason, SilentAcquisition};
use crate::reporting::ErrorReporter;

/// Lifetime of tokens minted by the stub.
const STUB_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// HS256 key the stub signs identity tokens with.
const STUB_SIGNING_KEY: &[u8] = b"stub-identity-signing-key";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Stub User
// =============================================================================

/// User the stub signs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubUser {
    /// Directory object id (without policy suffix)
    pub object_id: String,
    /// Display name
    pub display_name: String,
    /// Sign-in email
    pub email: String,
    /// Upstream identity provider, for social sign-in
    pub identity_provider: Option<String>,
}

impl StubUser {
    /// Create a local-account user.
    pub fn new(
        object_id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            display_name: display_name.into(),
            email: email.into(),
            identity_provider: None,
        }
    }

    /// Mark the user as signed in through an upstream provider.
    pub fn with_identity_provider(mut self, idp: impl Into<String>) -> Self {
        self.identity_provider = Some(idp.into());
        self
    }
}

impl Default for StubUser {
    fn default() -> Self {
        Self::new(
            "6b0c3f2a-8d1e-4c55-9f7a-2e4b1d9c0a11",
            "Tailwind Demo",
            "demo@tailwinds.example",
        )
    }
}

// =============================================================================
// Id Token Builder
// =============================================================================

/// Builds HS256 identity tokens signed with a fixed test key.
#[derive(Debug, Clone, Default)]
pub struct IdTokenBuilder {
    claims: IdTokenClaims,
}

impl IdTokenBuilder {
    /// Start from empty claims.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a policy authority issues for `user`.
    pub fn for_user(user: &StubUser, policy: &str) -> Self {
        let now = Utc::now();
        Self {
            claims: IdTokenClaims {
                sub: Some(user.object_id.clone()),
                oid: Some(user.object_id.clone()),
                name: Some(user.display_name.clone()),
                emails: vec![user.email.clone()],
                idp: user.identity_provider.clone(),
                tfp: Some(policy.to_string()),
                iat: Some(now.timestamp()),
                exp: Some((now + Duration::minutes(STUB_TOKEN_LIFETIME_MINUTES)).timestamp()),
                ..IdTokenClaims::default()
            },
        }
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.claims.iss = Some(issuer.into());
        self
    }

    /// Set the audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.claims.aud = Some(audience.into());
        self
    }

    /// Set the expiry (seconds since the epoch).
    pub fn with_expiry(mut self, exp: i64) -> Self {
        self.claims.exp = Some(exp);
        self
    }

    /// Add an untyped claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.claims.extra.insert(name.into(), value);
        self
    }

    /// Encode and sign the claims.
    ///
    /// An encoding failure yields an empty token, which never decodes.
    pub fn build(&self) -> IdToken {
        let raw = encode(
            &Header::new(Algorithm::HS256),
            &self.claims,
            &EncodingKey::from_secret(STUB_SIGNING_KEY),
        )
        .unwrap_or_default();
        IdToken::new(raw)
    }
}

// =============================================================================
// Stub Identity Provider
// =============================================================================

/// Scripted outcome for silent acquisition.
#[derive(Debug, Clone)]
pub enum StubSilentBehavior {
    /// Mint a token for any cached account
    Acquire,
    /// Ask for interaction
    InteractionRequired(InteractionReason),
    /// Fail with the given error
    Fail(IdentityError),
}

/// Scripted outcome for interactive acquisition.
#[derive(Debug, Clone)]
pub enum StubInteractiveBehavior {
    /// Sign the user in and cache their account
    SignIn(StubUser),
    /// User dismissed the UI
    Cancel,
    /// Fail with the given error
    Fail(IdentityError),
}

/// Arguments of one interactive acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveCall {
    /// Requested scopes
    pub scopes: Vec<String>,
    /// Account hint passed by the caller
    pub account_hint: Option<Account>,
    /// Presentation context passed by the caller
    pub context: Option<PresentationContext>,
}

struct CachedEntry {
    account: Account,
    user: StubUser,
}

/// Stub identity provider for testing.
///
/// Keeps an in-memory account cache and mints unsigned tokens.
pub struct StubIdentityProvider {
    authority: String,
    hostname: String,
    tenant: String,
    client_id: String,
    policy: String,
    /// Cached accounts in enumeration order
    cache: Mutex<Vec<CachedEntry>>,
    silent_behavior: Mutex<StubSilentBehavior>,
    interactive_behavior: Mutex<StubInteractiveBehavior>,
    interactive_calls: Mutex<Vec<InteractiveCall>>,
    silent_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    /// Removal call number (1-based) from which removals fail
    fail_remove_from: Mutex<Option<usize>>,
    fail_listing: AtomicBool,
    repopulate_on_remove: AtomicBool,
    malformed_tokens: AtomicBool,
    token_counter: AtomicU64,
}

impl StubIdentityProvider {
    /// Create a stub for the given configuration with an empty cache.
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            authority: config.authority(),
            hostname: config.hostname.clone(),
            tenant: config.tenant.clone(),
            client_id: config.client_id.clone(),
            policy: config.policy.clone(),
            cache: Mutex::new(Vec::new()),
            silent_behavior: Mutex::new(StubSilentBehavior::Acquire),
            interactive_behavior: Mutex::new(StubInteractiveBehavior::SignIn(StubUser::default())),
            interactive_calls: Mutex::new(Vec::new()),
            silent_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            fail_remove_from: Mutex::new(None),
            fail_listing: AtomicBool::new(false),
            repopulate_on_remove: AtomicBool::new(false),
            malformed_tokens: AtomicBool::new(false),
            token_counter: AtomicU64::new(0),
        }
    }

    /// Cache an account for `user` under the configured policy.
    pub fn seed_account(&self, user: StubUser) -> Account {
        let policy = self.policy.clone();
        self.seed_account_for_policy(user, &policy)
    }

    /// Cache an account for `user` under an arbitrary policy.
    pub fn seed_account_for_policy(&self, user: StubUser, policy: &str) -> Account {
        let account = self.account_for(&user, policy);
        lock(&self.cache).push(CachedEntry {
            account: account.clone(),
            user,
        });
        account
    }

    /// Script silent acquisition.
    pub fn set_silent_behavior(&self, behavior: StubSilentBehavior) {
        *lock(&self.silent_behavior) = behavior;
    }

    /// Script interactive acquisition.
    pub fn set_interactive_behavior(&self, behavior: StubInteractiveBehavior) {
        *lock(&self.interactive_behavior) = behavior;
    }

    /// Make removals fail from the `call`-th removal on (1-based).
    pub fn fail_removals_from(&self, call: Option<usize>) {
        *lock(&self.fail_remove_from) = call;
    }

    /// Make account listing fail.
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Add a fresh account after every removal (never-empty cache).
    pub fn set_repopulate_on_remove(&self, repopulate: bool) {
        self.repopulate_on_remove.store(repopulate, Ordering::SeqCst);
    }

    /// Issue identity tokens that cannot be decoded.
    pub fn set_malformed_tokens(&self, malformed: bool) {
        self.malformed_tokens.store(malformed, Ordering::SeqCst);
    }

    /// Number of cached accounts.
    pub fn cached_count(&self) -> usize {
        lock(&self.cache).len()
    }

    /// Number of silent acquisitions attempted.
    pub fn silent_call_count(&self) -> usize {
        self.silent_calls.load(Ordering::SeqCst)
    }

    /// Number of removals attempted.
    pub fn remove_call_count(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Interactive acquisitions attempted, oldest first.
    pub fn interactive_calls(&self) -> Vec<InteractiveCall> {
        lock(&self.interactive_calls).clone()
    }

    fn account_for(&self, user: &StubUser, policy: &str) -> Account {
        Account::new(
            HomeAccountId::new(
                format!("{}-{}", user.object_id, policy.to_lowercase()),
                self.tenant.clone(),
            ),
            user.email.clone(),
            self.hostname.clone(),
        )
    }

    fn issue(&self, user: &StubUser, account: Account, scopes: &[String]) -> AuthenticationResult {
        let serial = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id_token = if self.malformed_tokens.load(Ordering::SeqCst) {
            IdToken::new(format!("malformed-{}", serial))
        } else {
            IdTokenBuilder::for_user(user, &self.policy)
                .with_issuer(format!("https://{}/{}/v2.0/", self.hostname, self.tenant))
                .with_audience(self.client_id.clone())
                .build()
        };

        AuthenticationResult {
            id_token,
            access_token: AccessToken::new(format!("stub-access-{}", serial)),
            account,
            expires_on: Utc::now() + Duration::minutes(STUB_TOKEN_LIFETIME_MINUTES),
            scopes: scopes.to_vec(),
            correlation_id: Uuid::now_v7(),
        }
    }
}

#[async_trait]
impl IdentityProviderPort for StubIdentityProvider {
    async fn list_cached_accounts(&self) -> Result<Vec<Account>, IdentityError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(IdentityError::Provider("Simulated cache read failure".to_string()));
        }

        Ok(lock(&self.cache).iter().map(|entry| entry.account.clone()).collect())
    }

    async fn acquire_token_silently(
        &self,
        scopes: &[String],
        account: &Account,
        authority: &str,
    ) -> Result<SilentAcquisition, IdentityError> {
        self.silent_calls.fetch_add(1, Ordering::SeqCst);

        if authority != self.authority {
            return Err(IdentityError::Provider(format!(
                "Authority mismatch: expected {}, got {}",
                self.authority, authority
            )));
        }

        let behavior = lock(&self.silent_behavior).clone();
        match behavior {
            StubSilentBehavior::Fail(error) => Err(error),
            StubSilentBehavior::InteractionRequired(reason) => {
                Ok(SilentAcquisition::InteractionRequired(reason))
            }
            StubSilentBehavior::Acquire => {
                let user = lock(&self.cache)
                    .iter()
                    .find(|entry| entry.account.home_account_id == account.home_account_id)
                    .map(|entry| entry.user.clone());

                match user {
                    Some(user) => {
                        debug!(account = %account.home_account_id, "Stub: silent token issued");
                        Ok(SilentAcquisition::Acquired(self.issue(&user, account.clone(), scopes)))
                    }
                    None => Ok(SilentAcquisition::InteractionRequired(
                        InteractionReason::NoValidSession,
                    )),
                }
            }
        }
    }

    async fn acquire_token_interactively(
        &self,
        scopes: &[String],
        account_hint: Option<&Account>,
        context: Option<&PresentationContext>,
    ) -> Result<AuthenticationResult, IdentityError> {
        lock(&self.interactive_calls).push(InteractiveCall {
            scopes: scopes.to_vec(),
            account_hint: account_hint.cloned(),
            context: context.cloned(),
        });

        let behavior = lock(&self.interactive_behavior).clone();
        match behavior {
            StubInteractiveBehavior::Cancel => Err(IdentityError::Cancelled),
            StubInteractiveBehavior::Fail(error) => Err(error),
            StubInteractiveBehavior::SignIn(user) => {
                let account = self.account_for(&user, &self.policy);
                {
                    let mut cache = lock(&self.cache);
                    if !cache
                        .iter()
                        .any(|entry| entry.account.home_account_id == account.home_account_id)
                    {
                        cache.push(CachedEntry {
                            account: account.clone(),
                            user: user.clone(),
                        });
                    }
                }

                debug!(account = %account.home_account_id, "Stub: interactive sign-in completed");
                Ok(self.issue(&user, account, scopes))
            }
        }
    }

    async fn remove_account(&self, account: &Account) -> Result<(), IdentityError> {
        let call = self.remove_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(from) = *lock(&self.fail_remove_from) {
            if call >= from {
                return Err(IdentityError::Provider("Simulated removal failure".to_string()));
            }
        }

        let mut cache = lock(&self.cache);
        if let Some(index) = cache
            .iter()
            .position(|entry| entry.account.home_account_id == account.home_account_id)
        {
            cache.remove(index);
        }

        if self.repopulate_on_remove.load(Ordering::SeqCst) {
            let user = StubUser::new(format!("ghost-{}", call), "Ghost", "ghost@example.com");
            let account = self.account_for(&user, &self.policy);
            cache.push(CachedEntry { account, user });
        }

        Ok(())
    }
}

// =============================================================================
// Recording Error Reporter
// =============================================================================

/// Error sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingErrorReporter {
    reported: Mutex<Vec<IdentityError>>,
}

impl RecordingErrorReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors reported so far, oldest first.
    pub fn reported(&self) -> Vec<IdentityError> {
        lock(&self.reported).clone()
    }

    /// Number of errors reported.
    pub fn count(&self) -> usize {
        lock(&self.reported).len()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report(&self, error: &IdentityError) {
        lock(&self.reported).push(error.clone());
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use identity_domain::AuthenticatedUser;

    fn stub() -> (IdentityConfig, StubIdentityProvider) {
        let config = IdentityConfig::default();
        let provider = StubIdentityProvider::new(&config);
        (config, provider)
    }

    #[test]
    fn test_id_token_builder_produces_decodable_token() {
        let user = StubUser::new("oid-1", "Ada", "ada@example.com").with_identity_provider("github.com");
        let token = IdTokenBuilder::for_user(&user, "B2C_1_Signin")
            .with_audience("client")
            .with_claim("ver", serde_json::json!("1.0"))
            .build();

        let view = AuthenticatedUser::from_id_token(&token).unwrap();
        assert_eq!(view.object_id, "oid-1");
        assert_eq!(view.identity_provider.as_deref(), Some("github.com"));
        assert_eq!(view.policy.as_deref(), Some("B2C_1_Signin"));
        assert_eq!(token.claims().unwrap().aud.as_deref(), Some("client"));
    }

    #[test]
    fn test_id_token_verifies_with_stub_key() {
        let user = StubUser::default();
        let token = IdTokenBuilder::for_user(&user, "B2C_1_Signin").build();
        let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let decoded = jsonwebtoken::decode::<IdTokenClaims>(
            token.as_str(),
            &jsonwebtoken::DecodingKey::from_secret(STUB_SIGNING_KEY),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.oid, Some(user.object_id));
    }

    #[test]
    fn test_seeded_account_carries_policy_suffix() {
        let (_, provider) = stub();

        let account = provider.seed_account(StubUser::new("oid-1", "Ada", "ada@example.com"));

        assert_eq!(account.home_account_id.object_id, "oid-1-b2c_1_signin");
        assert_eq!(account.home_account_id.tenant_id, "tailwinds.onmicrosoft.com");
        assert!(account.matches_policy("B2C_1_Signin"));
        assert_eq!(provider.cached_count(), 1);
    }

    #[tokio::test]
    async fn test_silent_acquisition_for_cached_account() {
        let (config, provider) = stub();
        let account = provider.seed_account(StubUser::default());

        let outcome = provider
            .acquire_token_silently(&config.scopes, &account, &config.authority())
            .await
            .unwrap();

        match outcome {
            SilentAcquisition::Acquired(result) => {
                assert_eq!(result.account, account);
                assert_eq!(result.scopes, config.scopes);
                assert_eq!(result.access_token.as_str(), "stub-access-1");
            }
            other => panic!("Expected Acquired, got {:?}", other),
        }
        assert_eq!(provider.silent_call_count(), 1);
    }

    #[tokio::test]
    async fn test_silent_acquisition_rejects_foreign_authority() {
        let (config, provider) = stub();
        let account = provider.seed_account(StubUser::default());

        let result = provider
            .acquire_token_silently(&config.scopes, &account, "https://elsewhere/tfp/x/y")
            .await;

        assert!(matches!(result, Err(IdentityError::Provider(_))));
    }

    #[tokio::test]
    async fn test_silent_acquisition_for_unknown_account_needs_interaction() {
        let (config, provider) = stub();
        let stranger = Account::new(
            HomeAccountId::new("nobody-b2c_1_signin", "tenant"),
            "nobody@example.com",
            "tailwinds.b2clogin.com",
        );

        let outcome = provider
            .acquire_token_silently(&config.scopes, &stranger, &config.authority())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SilentAcquisition::InteractionRequired(InteractionReason::NoValidSession)
        ));
    }

    #[tokio::test]
    async fn test_interactive_sign_in_caches_account_once() {
        let (config, provider) = stub();
        let context = PresentationContext::new("window-1");

        provider
            .acquire_token_interactively(&config.scopes, None, Some(&context))
            .await
            .unwrap();
        provider
            .acquire_token_interactively(&config.scopes, None, None)
            .await
            .unwrap();

        assert_eq!(provider.cached_count(), 1);
        let calls = provider.interactive_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].context, Some(context));
        assert_eq!(calls[1].context, None);
    }

    #[tokio::test]
    async fn test_interactive_cancel() {
        let (config, provider) = stub();
        provider.set_interactive_behavior(StubInteractiveBehavior::Cancel);

        let result = provider.acquire_token_interactively(&config.scopes, None, None).await;

        assert_eq!(result.unwrap_err(), IdentityError::Cancelled);
        assert_eq!(provider.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_account_removes_exactly_one() {
        let (_, provider) = stub();
        let first = provider.seed_account(StubUser::new("oid-1", "A", "a@example.com"));
        provider.seed_account(StubUser::new("oid-2", "B", "b@example.com"));

        provider.remove_account(&first).await.unwrap();

        let remaining = provider.list_cached_accounts().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].home_account_id.object_id, "oid-2-b2c_1_signin");
    }

    #[tokio::test]
    async fn test_scripted_removal_failure() {
        let (_, provider) = stub();
        let first = provider.seed_account(StubUser::new("oid-1", "A", "a@example.com"));
        let second = provider.seed_account(StubUser::new("oid-2", "B", "b@example.com"));
        provider.fail_removals_from(Some(2));

        assert!(provider.remove_account(&first).await.is_ok());
        assert!(provider.remove_account(&second).await.is_err());
        assert_eq!(provider.cached_count(), 1);
        assert_eq!(provider.remove_call_count(), 2);
    }

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingErrorReporter::new();

        reporter.report(&IdentityError::Cancelled);
        reporter.report(&IdentityError::Provider("boom".to_string()));

        assert_eq!(reporter.count(), 2);
        assert_eq!(
            reporter.reported(),
            vec![IdentityError::Cancelled, IdentityError::Provider("boom".to_string())]
        );
    }
}
