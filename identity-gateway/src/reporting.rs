//! Out-of-band error reporting.
//!
//! Interactive sign-in and sign-out never hand failures back as `Err`;
//! they are forwarded here instead (crash/telemetry pipeline in the host
//! application).

use tracing::error;

use crate::error::IdentityError;

/// Sink for failures that are not returned to the caller.
///
/// Fire-and-forget: implementations must not block on I/O.
pub trait ErrorReporter: Send + Sync {
    /// Record a failure.
    fn report(&self, error: &IdentityError);
}

/// Reporter that writes failures to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &IdentityError) {
        error!(error = %error, "Identity operation failed");
    }
}
