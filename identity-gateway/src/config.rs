//! Identity configuration.
//!
//! Loads configuration from environment variables with the Tailwind
//! tenant's values as defaults.
//!
//! # Environment Variables
//!
//! - `IDENTITY_TENANT`: Tenant domain (default: tailwinds.onmicrosoft.com)
//! - `IDENTITY_HOSTNAME`: Authority host (default: tailwinds.b2clogin.com)
//! - `IDENTITY_CLIENT_ID`: Application (client) id
//! - `IDENTITY_POLICY`: User flow name (default: B2C_1_Signin)
//! - `IDENTITY_REDIRECT_URI`: Redirect URI registered for the app
//! - `IDENTITY_KEYCHAIN_GROUP`: Platform keychain/storage group
//! - `IDENTITY_SCOPES`: Comma-separated API scopes
//! - `IDENTITY_MAX_SIGN_OUT_PASSES`: Removal pass limit for sign-out (default: 64)
//! - `IDENTITY_EVENT_CAPACITY`: Session event buffer (default: 64)
//! - `IDENTITY_DEFAULT_CONTEXT`: Default presentation context handle (optional)

use identity_domain::PresentationContext;
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{IdentityError, IdentityResult};

/// Default tenant.
pub const DEFAULT_TENANT: &str = "tailwinds.onmicrosoft.com";
/// Default authority host.
pub const DEFAULT_HOSTNAME: &str = "tailwinds.b2clogin.com";
/// Default application (client) id.
pub const DEFAULT_CLIENT_ID: &str = "cbd3e5fb-b1c2-496e-b276-08b58de76c2a";
/// Default user flow.
pub const DEFAULT_POLICY: &str = "B2C_1_Signin";
/// Default redirect URI.
pub const DEFAULT_REDIRECT_URI: &str = "msal-tailwinds-photos://auth";
/// Default keychain group.
pub const DEFAULT_KEYCHAIN_GROUP: &str = "com.microsoft.adalcache";
/// Default API scope.
pub const DEFAULT_SCOPE: &str = "https://tailwinds.onmicrosoft.com/api/Tailwinds.API";

/// Default removal pass limit for sign-out.
pub const DEFAULT_MAX_SIGN_OUT_PASSES: usize = 64;
/// Default session event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// =============================================================================
// Identity Configuration
// =============================================================================

/// Identity provider configuration, fixed at gateway construction.
///
/// The authority is always derived from `hostname`, `tenant` and `policy`;
/// it has no field of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Tenant domain
    pub tenant: String,
    /// Authority host
    pub hostname: String,
    /// Application (client) id
    pub client_id: String,
    /// User flow (policy) name
    pub policy: String,
    /// Redirect URI
    pub redirect_uri: String,
    /// Platform keychain/storage group for the token cache
    pub keychain_group: String,
    /// API scopes to request
    pub scopes: Vec<String>,
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> IdentityResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let scopes = match env_non_empty("IDENTITY_SCOPES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|scope| !scope.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.scopes,
        };

        let config = Self {
            tenant: env_non_empty("IDENTITY_TENANT").unwrap_or(defaults.tenant),
            hostname: env_non_empty("IDENTITY_HOSTNAME").unwrap_or(defaults.hostname),
            client_id: env_non_empty("IDENTITY_CLIENT_ID").unwrap_or(defaults.client_id),
            policy: env_non_empty("IDENTITY_POLICY").unwrap_or(defaults.policy),
            redirect_uri: env_non_empty("IDENTITY_REDIRECT_URI").unwrap_or(defaults.redirect_uri),
            keychain_group: env_non_empty("IDENTITY_KEYCHAIN_GROUP")
                .unwrap_or(defaults.keychain_group),
            scopes,
        };

        config.validate()?;
        Ok(config)
    }

    /// Authority without the policy: `https://{hostname}/tfp/{tenant}/`.
    pub fn authority_base(&self) -> String {
        format!("https://{}/tfp/{}/", self.hostname, self.tenant)
    }

    /// Policy authority: `https://{hostname}/tfp/{tenant}/{policy}`.
    pub fn authority(&self) -> String {
        format!("{}{}", self.authority_base(), self.policy)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `IdentityError::Config` on an empty field, a hostname that
    /// carries a scheme or path, or an empty scope list.
    pub fn validate(&self) -> IdentityResult<()> {
        let required = [
            ("tenant", &self.tenant),
            ("hostname", &self.hostname),
            ("client_id", &self.client_id),
            ("policy", &self.policy),
            ("redirect_uri", &self.redirect_uri),
            ("keychain_group", &self.keychain_group),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(IdentityError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.hostname.contains("://") || self.hostname.contains('/') {
            return Err(IdentityError::Config(format!(
                "hostname must be a bare host, got '{}'",
                self.hostname
            )));
        }

        if self.scopes.is_empty() {
            return Err(IdentityError::Config("at least one scope is required".to_string()));
        }
        if self.scopes.iter().any(|scope| scope.trim().is_empty()) {
            return Err(IdentityError::Config("scopes must not be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            tenant: DEFAULT_TENANT.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            policy: DEFAULT_POLICY.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            keychain_group: DEFAULT_KEYCHAIN_GROUP.to_string(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
        }
    }
}

// =============================================================================
// Gateway Options
// =============================================================================

/// Runtime knobs for a gateway instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Removal passes `sign_out` performs before giving up
    pub max_sign_out_passes: usize,
    /// Session event buffer before slow subscribers lag
    pub event_capacity: usize,
    /// Context used by interactive sign-in when the caller passes none
    pub default_presentation_context: Option<PresentationContext>,
}

impl GatewayOptions {
    /// Load options from environment variables.
    pub fn from_env() -> IdentityResult<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            max_sign_out_passes: load_usize_env(
                "IDENTITY_MAX_SIGN_OUT_PASSES",
                DEFAULT_MAX_SIGN_OUT_PASSES,
            )?,
            event_capacity: load_usize_env("IDENTITY_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?,
            default_presentation_context: env_non_empty("IDENTITY_DEFAULT_CONTEXT")
                .map(PresentationContext::new),
        })
    }
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            max_sign_out_passes: DEFAULT_MAX_SIGN_OUT_PASSES,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            default_presentation_context: None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn load_usize_env(key: &str, default: usize) -> IdentityResult<usize> {
    match env_non_empty(key) {
        Some(val) => match val.parse::<usize>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(IdentityError::Config(format!("Invalid {} value: {}", key, val))),
        },
        None => Ok(default),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const KEYS: [&str; 10] = [
        "IDENTITY_TENANT",
        "IDENTITY_HOSTNAME",
        "IDENTITY_CLIENT_ID",
        "IDENTITY_POLICY",
        "IDENTITY_REDIRECT_URI",
        "IDENTITY_KEYCHAIN_GROUP",
        "IDENTITY_SCOPES",
        "IDENTITY_MAX_SIGN_OUT_PASSES",
        "IDENTITY_EVENT_CAPACITY",
        "IDENTITY_DEFAULT_CONTEXT",
    ];

    fn with_env<T>(vars: &[(&str, &str)], test: impl FnOnce() -> T) -> T {
        let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        for key in KEYS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        let result = test();

        for key in KEYS {
            env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_default_authority() {
        let config = IdentityConfig::default();

        assert_eq!(
            config.authority_base(),
            "https://tailwinds.b2clogin.com/tfp/tailwinds.onmicrosoft.com/"
        );
        assert_eq!(
            config.authority(),
            "https://tailwinds.b2clogin.com/tfp/tailwinds.onmicrosoft.com/B2C_1_Signin"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_authority_tracks_policy_changes() {
        let config = IdentityConfig {
            policy: "B2C_1_SocialSignin".to_string(),
            ..IdentityConfig::default()
        };

        assert!(config.authority().ends_with("/tfp/tailwinds.onmicrosoft.com/B2C_1_SocialSignin"));
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let config = IdentityConfig {
            client_id: "  ".to_string(),
            ..IdentityConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(IdentityError::Config("client_id must not be empty".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_hostname_with_scheme() {
        let config = IdentityConfig {
            hostname: "https://tailwinds.b2clogin.com".to_string(),
            ..IdentityConfig::default()
        };

        assert!(matches!(config.validate(), Err(IdentityError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_missing_scopes() {
        let config = IdentityConfig {
            scopes: vec![],
            ..IdentityConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IdentityConfig {
            scopes: vec![" ".to_string()],
            ..IdentityConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_defaults() {
        with_env(&[], || {
            let config = IdentityConfig::from_env().unwrap();
            assert_eq!(config, IdentityConfig::default());

            let options = GatewayOptions::from_env().unwrap();
            assert_eq!(options, GatewayOptions::default());
        });
    }

    #[test]
    fn test_from_env_overrides() {
        with_env(
            &[
                ("IDENTITY_POLICY", "B2C_1_Signup"),
                ("IDENTITY_SCOPES", "api://read, api://write ,"),
                ("IDENTITY_MAX_SIGN_OUT_PASSES", "3"),
                ("IDENTITY_DEFAULT_CONTEXT", "main-window"),
            ],
            || {
                let config = IdentityConfig::from_env().unwrap();
                assert_eq!(config.policy, "B2C_1_Signup");
                assert_eq!(config.scopes, vec!["api://read", "api://write"]);
                assert!(config.authority().ends_with("/B2C_1_Signup"));

                let options = GatewayOptions::from_env().unwrap();
                assert_eq!(options.max_sign_out_passes, 3);
                assert_eq!(
                    options.default_presentation_context,
                    Some(PresentationContext::new("main-window"))
                );
            },
        );
    }

    #[test]
    fn test_from_env_rejects_invalid_numbers() {
        with_env(&[("IDENTITY_MAX_SIGN_OUT_PASSES", "0")], || {
            assert!(GatewayOptions::from_env().is_err());
        });
        with_env(&[("IDENTITY_EVENT_CAPACITY", "lots")], || {
            assert!(GatewayOptions::from_env().is_err());
        });
    }

    #[test]
    fn test_from_env_rejects_invalid_hostname() {
        with_env(&[("IDENTITY_HOSTNAME", "tailwinds.b2clogin.com/path")], || {
            assert!(IdentityConfig::from_env().is_err());
        });
    }
}
