//! Session state owned by a gateway.
//!
//! # Invariant
//!
//! `is_authenticated == true` implies both the last result and the user are
//! present, and the user was derived from that exact result's identity
//! token. [`SessionState::establish`] is the only way into `SignedIn`.

use identity_domain::{AuthenticatedUser, AuthenticationResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No usable session
    SignedOut,
    /// A token was acquired for the configured policy
    SignedIn,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::SignedOut => write!(f, "signed_out"),
            SessionStatus::SignedIn => write!(f, "signed_in"),
        }
    }
}

/// Mutable session fields, guarded by the gateway.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    is_authenticated: bool,
    authenticated_user: Option<AuthenticatedUser>,
    last_authentication_result: Option<AuthenticationResult>,
}

impl SessionState {
    pub(crate) fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub(crate) fn authenticated_user(&self) -> Option<&AuthenticatedUser> {
        self.authenticated_user.as_ref()
    }

    pub(crate) fn last_authentication_result(&self) -> Option<&AuthenticationResult> {
        self.last_authentication_result.as_ref()
    }

    /// Replace result and user together and mark the session signed in.
    pub(crate) fn establish(&mut self, result: AuthenticationResult, user: AuthenticatedUser) {
        self.last_authentication_result = Some(result);
        self.authenticated_user = Some(user);
        self.is_authenticated = true;
    }

    /// Drop the last result and leave `SignedIn`.
    ///
    /// The user view is kept as last-known user.
    pub(crate) fn sign_out(&mut self) {
        self.last_authentication_result = None;
        self.is_authenticated = false;
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_authenticated: self.is_authenticated,
            authenticated_user: self.authenticated_user.clone(),
            last_authentication_result: self.last_authentication_result.clone(),
        }
    }
}

/// Point-in-time copy of a gateway's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Whether a session is established
    pub is_authenticated: bool,
    /// User derived from the most recent acquisition (kept after sign-out)
    pub authenticated_user: Option<AuthenticatedUser>,
    /// Most recent acquisition, cleared on sign-out
    pub last_authentication_result: Option<AuthenticationResult>,
}

impl SessionSnapshot {
    /// Coarse state.
    pub fn status(&self) -> SessionStatus {
        if self.is_authenticated {
            SessionStatus::SignedIn
        } else {
            SessionStatus::SignedOut
        }
    }

    /// Check the signed-in invariant: user and result are present and the
    /// user is exactly what the result's identity token describes.
    pub fn is_consistent(&self) -> bool {
        if !self.is_authenticated {
            return true;
        }

        match (&self.last_authentication_result, &self.authenticated_user) {
            (Some(result), Some(user)) => matches!(
                AuthenticatedUser::from_id_token(&result.id_token),
                Ok(derived) if &derived == user
            ),
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{IdTokenBuilder, StubUser};
    use chrono::{Duration, Utc};
    use identity_domain::{AccessToken, Account, HomeAccountId};
    use uuid::Uuid;

    fn result_for(user: &StubUser) -> AuthenticationResult {
        AuthenticationResult {
            id_token: IdTokenBuilder::for_user(user, "B2C_1_Signin").build(),
            access_token: AccessToken::new("at"),
            account: Account::new(
                HomeAccountId::new(format!("{}-b2c_1_signin", user.object_id), "tenant"),
                user.email.clone(),
                "tailwinds.b2clogin.com",
            ),
            expires_on: Utc::now() + Duration::hours(1),
            scopes: vec![],
            correlation_id: Uuid::now_v7(),
        }
    }

    #[test]
    fn test_initial_state_is_signed_out() {
        let state = SessionState::default();
        let snapshot = state.snapshot();

        assert_eq!(snapshot.status(), SessionStatus::SignedOut);
        assert!(snapshot.authenticated_user.is_none());
        assert!(snapshot.last_authentication_result.is_none());
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_establish_then_sign_out_keeps_user() {
        let user = StubUser::new("oid-1", "Ada", "ada@example.com");
        let result = result_for(&user);
        let view = AuthenticatedUser::from_id_token(&result.id_token).unwrap();

        let mut state = SessionState::default();
        state.establish(result, view.clone());
        assert!(state.snapshot().is_consistent());
        assert_eq!(state.snapshot().status(), SessionStatus::SignedIn);

        state.sign_out();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status(), SessionStatus::SignedOut);
        assert!(snapshot.last_authentication_result.is_none());
        assert_eq!(snapshot.authenticated_user, Some(view));
    }

    #[test]
    fn test_mismatched_user_is_inconsistent() {
        let ada = StubUser::new("oid-1", "Ada", "ada@example.com");
        let bob = StubUser::new("oid-2", "Bob", "bob@example.com");
        let bob_view = AuthenticatedUser::from_id_token(&result_for(&bob).id_token).unwrap();

        let mut state = SessionState::default();
        state.establish(result_for(&ada), bob_view);

        assert!(!state.snapshot().is_consistent());
    }
}
