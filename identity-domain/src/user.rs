//! Signed-in user view.
//!
//! An [`AuthenticatedUser`] is derived from the identity token of one
//! [`AuthenticationResult`](crate::AuthenticationResult) and never mutated
//! afterwards. A new acquisition produces a new user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::token::{IdToken, IdTokenClaims};

/// User identity as described by the claims of an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Directory object id (`oid`, falling back to `sub`)
    pub object_id: String,
    /// Display name
    pub display_name: Option<String>,
    /// Given name
    pub given_name: Option<String>,
    /// Family name
    pub family_name: Option<String>,
    /// Primary sign-in email
    pub email: Option<String>,
    /// Upstream identity provider for social sign-in
    pub identity_provider: Option<String>,
    /// Policy (user flow) that authenticated the user
    pub policy: Option<String>,
    /// Identity token expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthenticatedUser {
    /// Build the user view from an identity token.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdToken` if the token cannot be decoded,
    /// or `DomainError::MissingClaim` if it carries neither `oid` nor `sub`.
    pub fn from_id_token(token: &IdToken) -> Result<Self, DomainError> {
        Self::from_claims(&token.claims()?)
    }

    /// Build the user view from already-decoded claims.
    pub fn from_claims(claims: &IdTokenClaims) -> Result<Self, DomainError> {
        let object_id = non_empty(&claims.oid)
            .or_else(|| non_empty(&claims.sub))
            .ok_or_else(|| DomainError::MissingClaim("oid".to_string()))?;

        Ok(Self {
            object_id: object_id.to_string(),
            display_name: claims.name.clone(),
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            email: claims.primary_email().map(str::to_string),
            identity_provider: claims.idp.clone(),
            policy: claims.policy().map(str::to_string),
            expires_at: claims.expires_at(),
        })
    }

    /// Display name, falling back to email, then object id.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.object_id)
    }
}

fn non_empty(claim: &Option<String>) -> Option<&str> {
    claim.as_deref().filter(|value| !value.is_empty())
}
