//! Firebase provisioning CLI.
//!
//! # Usage
//!
//! ```bash
//! # Set (or create) the password of an account
//! provision reset-password -e admin@example.com -p 'n3w-passw0rd'
//!
//! # Ensure the account's profile document carries the admin role
//! provision repair-profile -e admin@example.com
//!
//! # Publish firestore.rules to the project
//! provision deploy-rules --rules firestore.rules
//! ```
//!
//! # Commands
//!
//! - `reset-password` - Update or create an Auth user with a password
//! - `repair-profile` - Create or fix the `users/{uid}` admin profile
//! - `deploy-rules` - Deploy Firestore security rules
//!
//! The service account key is read from `--credentials`, then
//! `GOOGLE_APPLICATION_CREDENTIALS`, then `./service_account.json`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::convert::Infallible;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use provisioner_core::Email;
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod report;

#[derive(Debug, Parser)]
#[command(name = "provision")]
#[command(author, version, about = "Firebase account provisioning tools")]
struct Cli {
    /// Path to the service account key file
    #[arg(
        long,
        global = true,
        env = "GOOGLE_APPLICATION_CREDENTIALS",
        default_value = "service_account.json"
    )]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Set the password of an Auth user, creating the user if missing
    ResetPassword {
        /// Account email address
        #[arg(short, long)]
        email: Email,

        /// New password
        #[arg(
            short,
            long,
            env = "PROVISION_PASSWORD",
            hide_env_values = true,
            value_parser = parse_secret
        )]
        password: SecretString,
    },
    /// Ensure the user's profile document exists with the admin role
    RepairProfile {
        /// Account email address
        #[arg(short, long)]
        email: Email,
    },
    /// Deploy Firestore security rules
    DeployRules {
        /// Rules source file
        #[arg(long, default_value = "firestore.rules")]
        rules: PathBuf,
    },
}

#[allow(clippy::unnecessary_wraps)]
fn parse_secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::from(value))
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());

    // Diagnostics go to stderr so stdout carries only status lines
    let json = std::env::var("PROVISION_LOG_FORMAT").is_ok_and(|v| v == "json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "Command failed");
        report::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::ResetPassword { email, password } => {
            commands::reset_password::run(&cli.credentials, &email, &password).await
        }
        Commands::RepairProfile { email } => {
            commands::repair_profile::run(&cli.credentials, &email).await
        }
        Commands::DeployRules { rules } => {
            commands::deploy_rules::run(&cli.credentials, &rules).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_reset_password_args() {
        let cli = Cli::try_parse_from([
            "provision",
            "reset-password",
            "--email",
            "Admin@Example.com",
            "--password",
            "hunter22",
        ])
        .unwrap();

        match cli.command {
            Commands::ResetPassword { email, password } => {
                assert_eq!(email.as_str(), "Admin@Example.com");
                assert_eq!(password.expose_secret(), "hunter22");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_debug_hides_password() {
        let cli = Cli::try_parse_from([
            "provision",
            "reset-password",
            "-e",
            "admin@example.com",
            "-p",
            "hunter22",
        ])
        .unwrap();

        let debug = format!("{cli:?}");
        assert!(debug.contains("admin@example.com"));
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let result = Cli::try_parse_from(["provision", "repair-profile", "-e", "not-an-email"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_deploy_rules_defaults() {
        let cli = Cli::try_parse_from([
            "provision",
            "--credentials",
            "/tmp/key.json",
            "deploy-rules",
        ])
        .unwrap();

        assert_eq!(cli.credentials, PathBuf::from("/tmp/key.json"));
        match cli.command {
            Commands::DeployRules { rules } => assert_eq!(rules, PathBuf::from("firestore.rules")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
