// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use keel_core::auth::{self, TokenManager};
use keel_core::config::{self, Settings};
use keel_core::tls::{ClientCredentials, ServerCredentials};

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Version => {
            println!(
                "{} {} (keel_core {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                keel_core::version()
            );
        }
        Commands::IssueAccess {
            user,
            tenant,
            email,
            roles,
        } => {
            let token = tokens(&args.global)?.issue_access(user, tenant, email, roles)?;
            println!("{token}");
        }
        Commands::IssueRefresh { user, tenant } => {
            let token = tokens(&args.global)?.issue_refresh(user, tenant)?;
            println!("{token}");
        }
        Commands::Verify { token, refresh } => {
            let tokens = tokens(&args.global)?;
            let principal = if *refresh {
                tokens.verify_refresh(token)?
            } else {
                tokens.verify(token)?
            };
            println!("{}", serde_json::to_string_pretty(&principal)?);
        }
        Commands::Refresh { token } => {
            println!("{}", tokens(&args.global)?.refresh(token)?);
        }
        Commands::HashPassword { password } => {
            println!("{}", auth::password::hash_password(password)?);
        }
        Commands::CheckPassword { password, hash } => {
            if !auth::password::verify_password(password, hash)? {
                return Err(Error::Custom("password does not match".into()));
            }
            if auth::password::needs_rehash(hash)? {
                log::warn!("hash cost is below the current default; rehash it");
            }
            println!("ok");
        }
        Commands::GenSecret { len } => {
            println!("{}", keel_core::random::token_urlsafe(*len));
        }
        Commands::CheckTls => check_tls(&settings(&args.global)?)?,
    }

    Ok(())
}

/// Resolve settings, letting `--secret` stand in for `KEEL_JWT_SECRET`.
fn settings(global: &GlobalArgs) -> Result<Settings> {
    let secret = global.secret.clone();
    let settings = config::load_with(global.config.as_deref(), |key| match key {
        "KEEL_JWT_SECRET" => secret.clone(),
        _ => std::env::var(key).ok(),
    })?;
    log::debug!(
        "settings resolved for service {} ({})",
        settings.service.name,
        settings.service.environment
    );
    Ok(settings)
}

fn tokens(global: &GlobalArgs) -> Result<TokenManager> {
    let settings = settings(global)?;
    Ok(TokenManager::from_settings(&settings.auth)?)
}

fn check_tls(settings: &Settings) -> Result<()> {
    let server = ServerCredentials::from_settings(&settings.tls)?
        .ok_or_else(|| Error::Custom("TLS is not configured".into()))?;
    // Same material must also work for the client side of a peer link.
    ClientCredentials::from_settings(&settings.tls)?;

    println!(
        "ok: {:?}, minimum {:?}, {} trust anchor(s)",
        server.policy(),
        server.min_protocol_version(),
        server.trust_anchors()
    );
    Ok(())
}
