//! Identity CLI
//!
//! Drives an identity gateway from the command line against the in-memory
//! provider, for exercising configuration and session flows without a
//! real identity service.
//!
//! # Commands
//!
//! - `config`: Print the resolved provider configuration
//! - `sign-in`: Silent attempt, then interactive sign-in if needed
//! - `sign-out`: Drain the account cache and clear the session
//! - `demo`: Full lifecycle (sign-in, refresh, sign-out)

#![warn(clippy::all)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use identity_domain::PresentationContext;
use identity_gateway::{
    shared, GatewayOptions, IdentityConfig, IdentityGateway, SessionEvent, SessionEventReceiver,
    SessionSnapshot, SignInOutcome, SignOutOutcome, SilentOutcome, StubIdentityProvider, StubUser,
    TracingErrorReporter,
};

#[derive(Parser, Debug)]
#[command(name = "identityctl")]
#[command(about = "Policy-based identity session tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the resolved provider configuration
    Config,
    /// Sign in, showing UI only if no session can be obtained silently
    SignIn {
        /// Presentation context handle for the sign-in UI
        #[arg(long)]
        context: Option<String>,
        /// Accounts already in the token cache for the configured policy
        #[arg(long, default_value_t = 0)]
        cached: usize,
    },
    /// Remove every cached account and clear the session
    SignOut {
        /// Accounts in the token cache before sign-out
        #[arg(long, default_value_t = 1)]
        cached: usize,
    },
    /// Run sign-in, silent refresh and sign-out in sequence
    Demo {
        /// Presentation context handle for the sign-in UI
        #[arg(long)]
        context: Option<String>,
    },
}

/// Execute a parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = IdentityConfig::from_env().context("Failed to load identity configuration")?;
    let options = GatewayOptions::from_env().context("Failed to load gateway options")?;

    if cli.command == Command::Config {
        print_config(&config, &options);
        return Ok(());
    }

    let provider = Arc::new(StubIdentityProvider::new(&config));
    let gateway = IdentityGateway::with_options(
        config,
        options,
        provider.clone(),
        Arc::new(TracingErrorReporter),
    )?;
    let gateway = shared::install(gateway)?;
    let mut events = gateway.subscribe();

    match cli.command {
        Command::Config => {}
        Command::SignIn { context, cached } => {
            seed(&provider, cached);
            sign_in(gateway, context).await;
        }
        Command::SignOut { cached } => {
            seed(&provider, cached);
            gateway.silently_sign_in().await?;
            sign_out(gateway).await;
        }
        Command::Demo { context } => {
            sign_in(gateway, context).await;
            match gateway.silently_sign_in().await? {
                SilentOutcome::SignedIn => println!("refresh: token re-acquired silently"),
                SilentOutcome::InteractionRequired { reason } => {
                    println!("refresh: interaction required ({})", reason)
                }
            }
            sign_out(gateway).await;
        }
    }

    print_session(&gateway.snapshot().await);
    drain_events(&mut events);
    Ok(())
}

fn seed(provider: &StubIdentityProvider, count: usize) {
    for i in 0..count {
        let user = StubUser::new(
            format!("cached-{}", i + 1),
            format!("Cached User {}", i + 1),
            format!("cached{}@tailwinds.example", i + 1),
        );
        provider.seed_account(user);
    }
}

async fn sign_in(gateway: &IdentityGateway, context: Option<String>) {
    let context = context.map(PresentationContext::new);
    match gateway.interactively_sign_in(context).await {
        SignInOutcome::AlreadySignedIn => println!("sign-in: existing session, no UI shown"),
        SignInOutcome::SignedIn => println!("sign-in: completed"),
        SignInOutcome::Failed(error) => println!("sign-in: failed ({})", error),
    }
}

async fn sign_out(gateway: &IdentityGateway) {
    let report = gateway.sign_out().await;
    match report.outcome {
        SignOutOutcome::Completed => println!("sign-out: removed {} account(s)", report.removed),
        SignOutOutcome::Failed(error) => println!(
            "sign-out: stopped after {} account(s) ({})",
            report.removed, error
        ),
    }
}

fn print_config(config: &IdentityConfig, options: &GatewayOptions) {
    println!("authority:       {}", config.authority());
    println!("client id:       {}", config.client_id);
    println!("redirect uri:    {}", config.redirect_uri);
    println!("keychain group:  {}", config.keychain_group);
    println!("scopes:          {}", config.scopes.join(", "));
    println!("sign-out passes: {}", options.max_sign_out_passes);
    if let Some(context) = &options.default_presentation_context {
        println!("default context: {}", context);
    }
}

fn print_session(snapshot: &SessionSnapshot) {
    println!("status: {}", snapshot.status());
    if let Some(user) = &snapshot.authenticated_user {
        println!(
            "user:   {} ({})",
            user.display_name_or_email(),
            user.object_id
        );
    }
    if let Some(result) = &snapshot.last_authentication_result {
        println!("token:  expires {}", result.expires_on.to_rfc3339());
    }
}

fn drain_events(events: &mut SessionEventReceiver) {
    while let Some(received) = events.try_recv() {
        let event = match received {
            Ok(event) => event,
            Err(message) => {
                warn!(%message, "event stream lagged");
                continue;
            }
        };
        match event {
            SessionEvent::SignedIn {
                object_id,
                interactive,
                ..
            } => info!(%object_id, interactive, "event: signed in"),
            SessionEvent::Refreshed { object_id, .. } => info!(%object_id, "event: refreshed"),
            SessionEvent::SignedOut { removed, .. } => info!(removed, "event: signed out"),
            SessionEvent::SignInFailed { message, .. } => info!(%message, "event: sign-in failed"),
        }
    }
}
