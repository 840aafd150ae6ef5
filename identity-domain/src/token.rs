//! Tokens returned by a successful acquisition.
//!
//! # Security Model
//!
//! - Raw token strings are zeroized on drop
//! - `Debug` output never contains token material
//! - Identity token claims are decoded, never verified: signature and
//!   audience validation belong to the provider client that issued them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use jsonwebtoken::{decode, DecodingKey, Validation};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::account::Account;
use crate::error::DomainError;

// =============================================================================
// Id Token
// =============================================================================

/// Compact-serialized OpenID Connect identity token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct IdToken(String);

impl IdToken {
    /// Wrap a raw `header.payload.signature` string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload into claims.
    ///
    /// Signature, expiry and audience are not checked.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdToken` if the token is not a compact
    /// JWT or the payload is not a claims object.
    pub fn claims(&self) -> Result<IdTokenClaims, DomainError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<IdTokenClaims>(&self.0, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| DomainError::InvalidIdToken(e.to_string()))
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdToken([REDACTED; {} bytes])", self.0.len())
    }
}

/// Claims carried by a policy-based identity token.
///
/// Only the claims the client reads are typed; everything else is kept
/// in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Object id of the user in the directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Sign-in email addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    /// Upstream identity provider (social sign-in)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp: Option<String>,
    /// Trust framework policy (user flow) that issued the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfp: Option<String>,
    /// Authentication context class; older tenants put the policy here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience (client id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiry, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Claims without a typed field
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IdTokenClaims {
    /// Policy that issued the token (`tfp`, falling back to `acr`).
    pub fn policy(&self) -> Option<&str> {
        self.tfp.as_deref().or(self.acr.as_deref())
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// First sign-in email, if any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }
}

// =============================================================================
// Access Token
// =============================================================================

/// Bearer token for the requested API scopes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw bearer token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token string, for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

// =============================================================================
// Authentication Result
// =============================================================================

/// Outcome of a successful silent or interactive acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    /// Identity token describing the signed-in user
    pub id_token: IdToken,
    /// Access token for the requested scopes
    pub access_token: AccessToken,
    /// Account the tokens were issued to
    pub account: Account,
    /// When the access token expires
    pub expires_on: DateTime<Utc>,
    /// Scopes actually granted
    pub scopes: Vec<String>,
    /// Provider correlation id for diagnostics
    pub correlation_id: Uuid,
}

impl AuthenticationResult {
    /// Check whether the access token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_on <= now
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::HomeAccountId;
    use chrono::Duration;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde_json::json;

    fn sign(payload: &serde_json::Value, key: &[u8]) -> IdToken {
        let raw = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            payload,
            &EncodingKey::from_secret(key),
        )
        .expect("token should encode");
        IdToken::new(raw)
    }

    fn encode(payload: &serde_json::Value) -> IdToken {
        sign(payload, b"issuer-key")
    }

    #[test]
    fn test_claims_decode_typed_and_extra_fields() {
        let token = encode(&json!({
            "oid": "6b0c3f2a",
            "name": "Ada Lovelace",
            "emails": ["ada@example.com", "ada@work.example.com"],
            "tfp": "B2C_1_Signin",
            "exp": 1_900_000_000,
            "ver": "1.0"
        }));

        let claims = token.claims().unwrap();

        assert_eq!(claims.oid.as_deref(), Some("6b0c3f2a"));
        assert_eq!(claims.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(claims.primary_email(), Some("ada@example.com"));
        assert_eq!(claims.policy(), Some("B2C_1_Signin"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_900_000_000);
        assert_eq!(claims.extra.get("ver"), Some(&json!("1.0")));
    }

    #[test]
    fn test_policy_falls_back_to_acr() {
        let claims = encode(&json!({ "sub": "s", "acr": "b2c_1_signin" })).claims().unwrap();

        assert_eq!(claims.policy(), Some("b2c_1_signin"));
    }

    #[test]
    fn test_claims_ignore_signature_and_expiry() {
        let token = sign(&json!({ "sub": "abc", "aud": "client", "exp": 1 }), b"unknown-key");

        let claims = token.claims().unwrap();

        assert_eq!(claims.sub.as_deref(), Some("abc"));
        assert_eq!(claims.aud.as_deref(), Some("client"));
    }

    #[test]
    fn test_claims_reject_wrong_segment_count() {
        let err = IdToken::new("only-one-segment").claims().unwrap_err();
        assert!(matches!(err, DomainError::InvalidIdToken(_)));

        assert!(IdToken::new("a.b.c.d").claims().is_err());
    }

    #[test]
    fn test_claims_reject_non_json_payload() {
        // {"alg":"HS256","typ":"JWT"} . "not json"
        let token = IdToken::new("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.bm90IGpzb24.sig");

        assert!(matches!(token.claims(), Err(DomainError::InvalidIdToken(_))));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let id_token = IdToken::new("secret.header.value");
        let access_token = AccessToken::new("bearer-secret");

        assert!(!format!("{:?}", id_token).contains("secret"));
        assert!(!format!("{:?}", access_token).contains("secret"));
    }

    #[test]
    fn test_result_expiry() {
        let now = Utc::now();
        let result = AuthenticationResult {
            id_token: encode(&json!({ "sub": "s" })),
            access_token: AccessToken::new("at"),
            account: Account::new(
                HomeAccountId::new("s-b2c_1_signin", "tenant"),
                "ada@example.com",
                "tailwinds.b2clogin.com",
            ),
            expires_on: now + Duration::minutes(5),
            scopes: vec!["api://read".to_string()],
            correlation_id: Uuid::now_v7(),
        };

        assert!(!result.is_expired_at(now));
        assert!(result.is_expired_at(now + Duration::minutes(5)));
    }
}
