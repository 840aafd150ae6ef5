//! identityctl
//!
//! # Usage
//!
//! ```bash
//! # Full lifecycle against the in-memory provider
//! cargo run -p identity-cli -- demo --context main-window
//!
//! # Sign-out with three cached accounts
//! cargo run -p identity-cli -- sign-out --cached 3
//! ```
//!
//! # Environment Variables
//!
//! - `IDENTITY_TENANT`, `IDENTITY_HOSTNAME`, `IDENTITY_CLIENT_ID`, `IDENTITY_POLICY`
//! - `IDENTITY_REDIRECT_URI`, `IDENTITY_KEYCHAIN_GROUP`, `IDENTITY_SCOPES`
//! - `IDENTITY_MAX_SIGN_OUT_PASSES`, `IDENTITY_EVENT_CAPACITY`, `IDENTITY_DEFAULT_CONTEXT`
//! - `RUST_LOG`: Log filter (default adds `identity=info`)

use clap::Parser;
use identity_cli::{run, Cli};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("identity=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "identityctl");

    run(cli).await
}
