//! Cached accounts as reported by the identity provider client.
//!
//! The provider owns its account cache. Callers only ever hold transient
//! copies of an [`Account`] for the duration of a single operation.
//!
//! # Home Account Identifier
//!
//! Policy-based authorities issue home account identifiers of the form
//! `{object_id}.{tenant_id}`, where the object id carries the user flow as
//! its suffix:
//!
//! ```text
//! 6b0c3f2a-...-b2c_1_signin.775527ff-...
//! └──────── object id ───────┘└ tenant ┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

// =============================================================================
// Home Account Id
// =============================================================================

/// Home account identifier of a cached account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HomeAccountId {
    /// Object id, suffixed with the lowercased policy name.
    pub object_id: String,
    /// Tenant the account was issued by.
    pub tenant_id: String,
}

impl HomeAccountId {
    /// Create a home account id from its parts.
    pub fn new(object_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Parse a full `{object_id}.{tenant_id}` identifier.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAccountId` if either part is empty.
    pub fn parse(identifier: &str) -> Result<Self, DomainError> {
        let Some((object_id, tenant_id)) = identifier.split_once('.') else {
            return Err(DomainError::InvalidAccountId(format!(
                "expected '{{object_id}}.{{tenant_id}}', got '{}'",
                identifier
            )));
        };

        if object_id.is_empty() || tenant_id.is_empty() {
            return Err(DomainError::InvalidAccountId(format!(
                "empty segment in '{}'",
                identifier
            )));
        }

        Ok(Self::new(object_id, tenant_id))
    }

    /// Full identifier: `{object_id}.{tenant_id}`.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.object_id, self.tenant_id)
    }

    /// Check whether this account was issued for `policy`.
    ///
    /// Compares the segment before the first `.` against the policy name,
    /// case-insensitively, as a suffix. A blank policy never matches.
    pub fn matches_policy(&self, policy: &str) -> bool {
        let policy = policy.trim();
        if policy.is_empty() {
            return false;
        }

        let user_segment = self.object_id.split('.').next().unwrap_or_default();
        user_segment.to_lowercase().ends_with(&policy.to_lowercase())
    }
}

impl fmt::Display for HomeAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object_id, self.tenant_id)
    }
}

// =============================================================================
// Account
// =============================================================================

/// Account handle held in the provider client's cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Home account identifier
    pub home_account_id: HomeAccountId,
    /// Username shown by the provider (often the sign-in email)
    pub username: String,
    /// Identity provider host that issued the account
    pub environment: String,
}

impl Account {
    /// Create a new account handle.
    pub fn new(
        home_account_id: HomeAccountId,
        username: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id,
            username: username.into(),
            environment: environment.into(),
        }
    }

    /// Check whether this account was issued for `policy`.
    pub fn matches_policy(&self, policy: &str) -> bool {
        self.home_account_id.matches_policy(policy)
    }
}

// =============================================================================
// Tests
// =============================================================================
