//! Static-analysis stage: ESLint with the security plugin, out of 25.

use serde_json::json;

use super::{Stage, StageOutcome, Workspace};
use crate::config::ToolSettings;
use crate::error::{Result, TrainerError};
use crate::rules::policy::{
    penalized, STATIC_ANALYSIS_MAX, STATIC_ANALYSIS_PARTIAL_FACTOR, STATIC_ANALYSIS_PENALTY,
};
use crate::rules::{IssueDetail, SecurityIssue, ValidationCheck};
use crate::tools::{eslint, CommandRunner, ToolFailure};

pub const CHECK_NAME: &str = "Static Analysis";

/// Run the linter stage. Tool problems and workspace setup failures,
/// including a manifest that can't be merged into, degrade to partial credit.
pub fn evaluate(
    runner: &dyn CommandRunner,
    settings: &ToolSettings,
    workspace: Option<&Workspace>,
) -> Result<StageOutcome> {
    if !settings.static_analysis {
        return Ok(partial("static analysis is disabled in configuration"));
    }
    let Some(workspace) = workspace else {
        return Ok(partial("no submitted files to analyse"));
    };

    match eslint::ensure_setup(&workspace.root) {
        Ok(report) => tracing::debug!(?report, root = %workspace.root.display(), "linter setup"),
        Err(e @ (TrainerError::Io(_) | TrainerError::Manifest { .. } | TrainerError::Json(_))) => {
            tracing::warn!(error = %e, "could not prepare workspace for linting");
            return Ok(partial(&format!("workspace setup failed: {e}")));
        }
        Err(e) => return Err(e),
    }

    match run_linter(runner, settings, workspace) {
        Ok(outcome) => Ok(outcome),
        Err(failure) => {
            tracing::warn!(error = %failure, "static analysis unavailable");
            Ok(partial(&failure.to_string()))
        }
    }
}

fn run_linter(
    runner: &dyn CommandRunner,
    settings: &ToolSettings,
    workspace: &Workspace,
) -> std::result::Result<StageOutcome, ToolFailure> {
    runner.probe(&settings.npx, settings.probe_timeout())?;

    let output = runner.run(&eslint::invocation(settings, &workspace.root, &workspace.files))?;
    let diagnostics = eslint::parse_report(&output.stdout)?;

    let issues: Vec<SecurityIssue> = diagnostics
        .into_iter()
        .filter(eslint::Diagnostic::is_security)
        .map(|d| SecurityIssue {
            severity: d.severity,
            message: d.message,
            detail: IssueDetail::StaticAnalysis {
                rule_id: d.rule_id.unwrap_or_default(),
                file: Some(d.file),
                line: d.line,
            },
        })
        .collect();

    let count = issues.len();
    let score = penalized(STATIC_ANALYSIS_MAX, STATIC_ANALYSIS_PENALTY, count);
    tracing::debug!(issues = count, score, "static analysis stage");

    let check = if count == 0 {
        ValidationCheck::pass(CHECK_NAME, "No security issues reported by the linter")
    } else {
        ValidationCheck::fail(
            CHECK_NAME,
            format!("Linter reported {count} security issue(s)"),
        )
    }
    .with_details(json!({ "issue_count": count }));

    let outcome = StageOutcome::new(Stage::StaticAnalysis, score, STATIC_ANALYSIS_MAX, check)
        .with_issues(issues);
    Ok(if count > 0 {
        outcome.recommend("Resolve the eslint-plugin-security findings listed above.")
    } else {
        outcome
    })
}

fn partial(reason: &str) -> StageOutcome {
    StageOutcome::new(
        Stage::StaticAnalysis,
        STATIC_ANALYSIS_MAX * STATIC_ANALYSIS_PARTIAL_FACTOR,
        STATIC_ANALYSIS_MAX,
        ValidationCheck::partial(
            CHECK_NAME,
            format!("Static analysis partially completed: {reason}"),
        ),
    )
    .recommend("Install Node.js and npm dependencies (npm install) to enable full static analysis.")
}
