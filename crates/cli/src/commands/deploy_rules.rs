//! `deploy-rules` command.

use std::path::Path;

use provisioner::provision::deploy_rules;
use provisioner::{ProvisionError, Step};

use super::{CommandError, init_app};
use crate::report;

fn report_step(step: Step<'_>) {
    if let Step::RulesetCreated { ruleset } = step {
        report::success(&format!("Ruleset created: {}", ruleset.name));
        report::progress("🚀 Releasing to cloud.firestore...");
    }
}

/// Publish the Firestore security rules in `rules`.
///
/// # Errors
///
/// Returns an error if the rules file is missing or any rules API call fails.
pub async fn run(credentials: &Path, rules: &Path) -> Result<(), CommandError> {
    let app = init_app(credentials)?;
    report::progress(&format!("📝 Reading {}...", rules.display()));

    deploy_rules(&app.security_rules(), rules, report_step)
        .await
        .map_err(|e| match e {
            ProvisionError::RulesSourceMissing(_) => CommandError::Provision(e),
            other => CommandError::Deploy(other),
        })?;

    report::success("Firestore Security Rules deployed successfully!");
    Ok(())
}
