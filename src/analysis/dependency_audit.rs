//! Dependency stage: `npm audit` over the workspace manifest, out of 15.

use serde_json::{json, Value};

use super::{Stage, StageOutcome, Workspace};
use crate::config::ToolSettings;
use crate::error::{Result, TrainerError};
use crate::rules::policy::{
    penalized, DEPENDENCY_MAX, DEPENDENCY_PARTIAL_FACTOR, DEPENDENCY_PENALTY,
};
use crate::rules::{IssueDetail, SecurityIssue, ValidationCheck};
use crate::tools::{eslint::MANIFEST_FILE, npm_audit, CommandRunner, ToolFailure};

pub const CHECK_NAME: &str = "Dependency Scan";

pub fn evaluate(
    runner: &dyn CommandRunner,
    settings: &ToolSettings,
    workspace: Option<&Workspace>,
) -> Result<StageOutcome> {
    let Some(workspace) = workspace else {
        return Ok(full("No dependency manifest found"));
    };
    let manifest_path = workspace.root.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Ok(full("No dependency manifest found"));
    }

    let content = std::fs::read_to_string(&manifest_path)?;
    let manifest: Value = match serde_json::from_str(&content) {
        Ok(manifest) => manifest,
        Err(e) => {
            let e = TrainerError::Manifest {
                path: manifest_path.display().to_string(),
                message: e.to_string(),
            };
            tracing::warn!(error = %e, "dependency manifest unreadable");
            return Ok(partial(&e.to_string()));
        }
    };
    if !npm_audit::declares_runtime_dependencies(&manifest) {
        return Ok(full("No runtime dependencies declared"));
    }

    if !settings.dependency_audit {
        return Ok(partial("dependency audit is disabled in configuration"));
    }

    match run_audit(runner, settings, workspace) {
        Ok(outcome) => Ok(outcome),
        Err(failure) => {
            tracing::warn!(error = %failure, "dependency audit unavailable");
            Ok(partial(&failure.to_string()))
        }
    }
}

fn run_audit(
    runner: &dyn CommandRunner,
    settings: &ToolSettings,
    workspace: &Workspace,
) -> std::result::Result<StageOutcome, ToolFailure> {
    runner.probe(&settings.npm, settings.probe_timeout())?;

    let output = runner.run(&npm_audit::invocation(settings, &workspace.root))?;
    let packages = npm_audit::parse_report(&output.stdout)?;

    let count = packages.len();
    let score = penalized(DEPENDENCY_MAX, DEPENDENCY_PENALTY, count);
    tracing::debug!(vulnerable_packages = count, score, "dependency stage");

    let issues: Vec<SecurityIssue> = packages
        .into_iter()
        .map(|p| SecurityIssue {
            severity: p.severity,
            message: match &p.title {
                Some(title) => format!("{}: {}", p.name, title),
                None => format!("{} has known vulnerabilities", p.name),
            },
            detail: IssueDetail::Dependency {
                package: p.name,
                title: p.title,
            },
        })
        .collect();

    let check = if count == 0 {
        ValidationCheck::pass(CHECK_NAME, "No vulnerable dependencies found")
    } else {
        ValidationCheck::fail(CHECK_NAME, format!("{count} vulnerable package(s) found"))
    }
    .with_details(json!({ "vulnerable_packages": count }));

    let outcome =
        StageOutcome::new(Stage::Dependency, score, DEPENDENCY_MAX, check).with_issues(issues);
    Ok(if count > 0 {
        outcome.recommend("Upgrade the vulnerable packages (npm audit fix) or replace them.")
    } else {
        outcome
    })
}

fn full(message: &str) -> StageOutcome {
    StageOutcome::new(
        Stage::Dependency,
        DEPENDENCY_MAX,
        DEPENDENCY_MAX,
        ValidationCheck::pass(CHECK_NAME, message),
    )
}

fn partial(reason: &str) -> StageOutcome {
    StageOutcome::new(
        Stage::Dependency,
        DEPENDENCY_MAX * DEPENDENCY_PARTIAL_FACTOR,
        DEPENDENCY_MAX,
        ValidationCheck::partial(
            CHECK_NAME,
            format!("Dependency scan partially completed: {reason}"),
        ),
    )
}
