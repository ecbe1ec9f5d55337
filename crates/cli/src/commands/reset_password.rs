//! `reset-password` command.

use std::path::Path;

use provisioner::provision::reset_password;
use provisioner::{ResetOutcome, Step};
use provisioner_core::Email;
use secrecy::SecretString;

use super::{CommandError, init_app};
use crate::report;

fn report_step(email: &Email, step: Step<'_>) {
    match step {
        Step::IdentityFound { uid } => {
            report::progress(&format!("User {email} found with UID: {uid}"));
        }
        Step::IdentityMissing => {
            report::progress(&format!("User {email} not found. Creating new user..."));
        }
        _ => {}
    }
}

/// Set the password of the account for `email`, creating it if missing.
///
/// # Errors
///
/// Returns an error if initialisation or any identity provider call fails.
pub async fn run(
    credentials: &Path,
    email: &Email,
    password: &SecretString,
) -> Result<(), CommandError> {
    let app = init_app(credentials)?;
    report::progress(&format!("Resetting password for {email}..."));

    let outcome = reset_password(&app.auth(), email, password, |step| {
        report_step(email, step);
    })
    .await?;

    match outcome {
        ResetOutcome::PasswordUpdated { .. } => {
            report::success(&format!("Successfully updated user {email} password"));
        }
        ResetOutcome::UserCreated { uid } => {
            report::success(&format!("Successfully created user {email} with UID: {uid}"));
        }
    }

    Ok(())
}
