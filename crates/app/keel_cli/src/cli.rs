use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "keel", version, about = "Issue and inspect Keel tokens")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// YAML settings file.
    #[arg(long, global = true, env = "KEEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// HMAC signing secret; overrides the settings file.
    #[arg(long, global = true, env = "KEEL_JWT_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Issue an access token.
    IssueAccess {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        tenant: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Repeat for several roles.
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Issue a refresh token.
    IssueRefresh {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        tenant: String,
    },

    /// Verify an access token and print its principal as JSON.
    Verify {
        token: String,
        /// Expect a refresh token instead.
        #[arg(long)]
        refresh: bool,
    },

    /// Exchange a refresh token for an access token.
    Refresh { token: String },

    /// Print a bcrypt hash of a password.
    HashPassword { password: String },

    /// Check a password against a bcrypt hash. Exits non-zero on mismatch.
    CheckPassword { password: String, hash: String },

    /// Print a random URL-safe secret.
    GenSecret {
        #[arg(long, default_value_t = 48)]
        len: usize,
    },

    /// Load the configured mTLS material and report what was loaded.
    CheckTls,
}
