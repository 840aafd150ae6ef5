//! Presentation context for interactive sign-in.
//!
//! Interactive acquisition needs a parent window (desktop) or activity
//! (mobile) to attach its sign-in UI to. The domain only carries an opaque
//! handle; the provider client knows how to resolve it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to the UI surface that hosts interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresentationContext(String);

impl PresentationContext {
    /// Wrap a platform window/activity handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Raw handle as understood by the provider client.
    pub fn handle(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PresentationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
