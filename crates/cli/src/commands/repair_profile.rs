//! `repair-profile` command.

use std::path::Path;

use provisioner::provision::repair_profile;
use provisioner::{RepairOutcome, Step};
use provisioner_core::Email;

use super::{CommandError, init_app};
use crate::report;

fn report_step(step: Step<'_>) {
    match step {
        Step::IdentityFound { uid } => report::success(&format!("Auth User found: {uid}")),
        Step::ProfileFound { document } => {
            report::info(&format!("Firestore document exists. Data: {document}"));
        }
        Step::ProfileMissing => report::warning("Firestore document MISSING. Creating now..."),
        _ => {}
    }
}

/// Ensure the profile document for `email` exists with the admin role.
///
/// # Errors
///
/// Returns an error if the account does not exist in Auth, or if
/// initialisation or any backend call fails.
pub async fn run(credentials: &Path, email: &Email) -> Result<(), CommandError> {
    let app = init_app(credentials)?;
    report::progress(&format!("Checking Auth user {email}..."));

    match repair_profile(&app.auth(), &app.firestore(), email, report_step).await? {
        RepairOutcome::Updated { .. } => report::success("Updated role to 'admin'."),
        RepairOutcome::Created { .. } => report::success("Created Admin Firestore document."),
    }

    Ok(())
}
