//! Validation orchestrator: runs the pattern, static-analysis and
//! dependency stages in order and folds them into one graded result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::{dependency_audit, pattern, static_analysis, Stage, StageOutcome, Workspace};
use crate::challenge::Submission;
use crate::config::{Config, ToolSettings};
use crate::error::Result;
use crate::rules::policy::{self, Grade, MAX_SCORE};
use crate::rules::{RuleRegistry, SecurityIssue, ValidationCheck};
use crate::tools::{CommandRunner, SystemRunner};

/// Name of the check recorded when a stage fails unexpectedly.
pub const ERROR_CHECK_NAME: &str = "Validation Error";

/// Per-stage contributions. `None` means the stage never ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub pattern: Option<f64>,
    pub static_analysis: Option<f64>,
    pub dependency: Option<f64>,
}

impl SubScores {
    fn set(&mut self, stage: Stage, score: f64) {
        match stage {
            Stage::Pattern => self.pattern = Some(score),
            Stage::StaticAnalysis => self.static_analysis = Some(score),
            Stage::Dependency => self.dependency = Some(score),
        }
    }

    fn values(&self) -> Vec<f64> {
        [self.pattern, self.static_analysis, self.dependency]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Graded outcome of one `validate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub challenge_id: String,
    pub category: String,
    pub passed: bool,
    pub score: u32,
    pub max_score: u32,
    pub grade: Grade,
    pub sub_scores: SubScores,
    pub checks: Vec<ValidationCheck>,
    pub issues: Vec<SecurityIssue>,
    pub recommendations: Vec<String>,
    /// SHA-256 of the analysed source text.
    pub submission_digest: String,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// True when any stage ran with partial credit or errored.
    pub fn is_partial(&self) -> bool {
        self.checks
            .iter()
            .any(|c| c.partial || c.name == ERROR_CHECK_NAME)
    }
}

/// Accumulates stage outcomes in order.
#[derive(Default)]
struct Tally {
    sub_scores: SubScores,
    checks: Vec<ValidationCheck>,
    issues: Vec<SecurityIssue>,
    recommendations: Vec<String>,
    errored: bool,
}

impl Tally {
    fn absorb(&mut self, outcome: StageOutcome) {
        tracing::debug!(
            stage = %outcome.stage,
            score = outcome.sub_score,
            max = outcome.max_score,
            "stage complete"
        );
        self.sub_scores.set(outcome.stage, outcome.sub_score);
        self.checks.push(outcome.check);
        self.issues.extend(outcome.issues);
        for recommendation in outcome.recommendations {
            if !self.recommendations.contains(&recommendation) {
                self.recommendations.push(recommendation);
            }
        }
    }

    fn fail(&mut self, message: String) {
        self.errored = true;
        self.checks.push(ValidationCheck::fail(ERROR_CHECK_NAME, message));
    }
}

/// Validates submissions against the rule registry and external tools.
pub struct Validator {
    registry: Arc<RuleRegistry>,
    tools: ToolSettings,
    runner: Arc<dyn CommandRunner>,
}

impl Validator {
    /// Build a validator from config. Fails if custom rules don't compile
    /// or aliases point at unknown rule sets.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            registry: RuleRegistry::with_config(&config.rules)?,
            tools: config.tools.clone(),
            runner: Arc::new(SystemRunner),
        })
    }

    /// Replace the subprocess runner.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run all stages. Never fails: an unexpected stage error becomes a
    /// failing "Validation Error" check and a non-passing result that keeps
    /// the score accumulated so far.
    pub fn validate(&self, submission: &Submission) -> ValidationResult {
        let mut tally = Tally::default();

        if let Err(e) = self.run_stages(submission, &mut tally) {
            tracing::warn!(error = %e, challenge = %submission.challenge_id, "validation aborted");
            tally.fail(format!("Validation could only be partially performed: {e}"));
        }

        let score = policy::total_score(&tally.sub_scores.values());
        let passed = !tally.errored && policy::is_passing(score);
        let grade = Grade::for_score(score);
        tracing::info!(
            challenge = %submission.challenge_id,
            score,
            %grade,
            passed,
            "validation finished"
        );

        ValidationResult {
            challenge_id: submission.challenge_id.clone(),
            category: submission.category.clone(),
            passed,
            score,
            max_score: MAX_SCORE,
            grade,
            sub_scores: tally.sub_scores,
            checks: tally.checks,
            issues: tally.issues,
            recommendations: tally.recommendations,
            submission_digest: digest(&submission.content),
            validated_at: Utc::now(),
        }
    }

    fn run_stages(&self, submission: &Submission, tally: &mut Tally) -> Result<()> {
        tally.absorb(pattern::evaluate(
            &self.registry,
            &submission.category,
            &submission.content,
        ));

        let workspace =
            Workspace::resolve(submission.workspace.as_deref(), &submission.file_paths);
        tally.absorb(static_analysis::evaluate(
            self.runner.as_ref(),
            &self.tools,
            workspace.as_ref(),
        )?);
        tally.absorb(dependency_audit::evaluate(
            self.runner.as_ref(),
            &self.tools,
            workspace.as_ref(),
        )?);
        Ok(())
    }
}

fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::tools::testing::{Reply, ScriptedRunner};
    use pretty_assertions::assert_eq;

    const SECURE_SQL: &str = "const q = 'SELECT * FROM users WHERE username = ? AND password = ?';\n\
                              db.query(q, [username, password]);\n";
    const CONCAT_SQL: &str =
        "const q = \"SELECT * FROM users WHERE username = '\" + username + \"'\";\ndb.query(q);\n";

    fn scripted_validator(lint: Reply, audit: Reply) -> (Validator, Arc<ScriptedRunner>) {
        let runner = Arc::new(ScriptedRunner::new(lint, audit));
        let validator = Validator::new(&Config::default())
            .unwrap()
            .with_runner(runner.clone());
        (validator, runner)
    }

    fn submission(dir: &tempfile::TempDir, content: &str) -> Submission {
        let file = dir.path().join("login.js");
        std::fs::write(&file, content).unwrap();
        Submission::new("sqli-01", "sql-injection-basic", vec![file], content)
    }

    #[test]
    fn secure_fix_with_clean_tools_scores_100() {
        let dir = tempfile::tempdir().unwrap();
        let (validator, _) = scripted_validator(Reply::stdout(0, "[]"), Reply::Unavailable);
        let result = validator.validate(&submission(&dir, SECURE_SQL));
        assert_eq!(result.score, 100);
        assert_eq!(result.grade, Grade::APlus);
        assert!(result.passed);
        assert_eq!(
            result.checks.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["SQL Injection Prevention", "Static Analysis", "Dependency Scan"]
        );
        assert!(result.issues.is_empty());
        assert!(!result.is_partial());
    }

    #[test]
    fn linter_failure_yields_partial_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let (validator, _) = scripted_validator(Reply::TimedOut, Reply::Unavailable);
        let result = validator.validate(&submission(&dir, SECURE_SQL));
        assert_eq!(result.sub_scores.static_analysis, Some(12.5));
        // 60 + 12.5 + 15
        assert_eq!(result.score, 88);
        assert_eq!(result.grade, Grade::AMinus);
        assert!(result.passed);
        assert!(result.is_partial());
    }

    #[test]
    fn vulnerable_submission_depends_on_tool_credit() {
        let dir = tempfile::tempdir().unwrap();
        let (validator, _) = scripted_validator(Reply::stdout(0, "[]"), Reply::Unavailable);
        let result = validator.validate(&submission(&dir, CONCAT_SQL));
        // 40 + 25 + 15
        assert_eq!(result.score, 80);
        assert!(result.passed);

        let dir = tempfile::tempdir().unwrap();
        let (validator, _) = scripted_validator(Reply::Unavailable, Reply::Unavailable);
        let result = validator.validate(&submission(&dir, CONCAT_SQL));
        // 40 + 12.5 + 15 = 67.5
        assert_eq!(result.score, 68);
        assert_eq!(result.grade, Grade::CPlus);
        assert!(!result.passed);
        assert!(!result.checks[0].passed);
        assert_eq!(result.issues.len(), 1);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn malformed_manifest_does_not_block_a_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name": "x", "devDependencies": []}"#,
        )
        .unwrap();
        let (validator, runner) = scripted_validator(Reply::stdout(0, "[]"), Reply::Unavailable);
        let result = validator.validate(&submission(&dir, SECURE_SQL));

        assert_eq!(result.sub_scores.pattern, Some(60.0));
        assert_eq!(result.sub_scores.static_analysis, Some(12.5));
        assert_eq!(result.sub_scores.dependency, Some(15.0));
        // 60 + 12.5 + 15 = 87.5
        assert_eq!(result.score, 88);
        assert!(result.passed);
        assert!(result.checks.iter().all(|c| c.name != ERROR_CHECK_NAME));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn stage_error_becomes_validation_error_check() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the manifest should be cannot be read
        std::fs::create_dir(dir.path().join("package.json")).unwrap();
        let (validator, _) = scripted_validator(Reply::stdout(0, "[]"), Reply::Unavailable);
        let result = validator.validate(&submission(&dir, SECURE_SQL));

        assert!(!result.passed);
        assert_eq!(result.sub_scores.pattern, Some(60.0));
        assert_eq!(result.sub_scores.static_analysis, Some(12.5));
        assert_eq!(result.sub_scores.dependency, None);
        // 60 + 12.5 = 72.5
        assert_eq!(result.score, 73);
        let last = result.checks.last().unwrap();
        assert_eq!(last.name, ERROR_CHECK_NAME);
        assert!(!last.passed);
        assert!(result.is_partial());
    }

    #[test]
    fn validate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (validator, _) = scripted_validator(Reply::stdout(0, "[]"), Reply::Unavailable);
        let sub = submission(&dir, CONCAT_SQL);
        let first = validator.validate(&sub);
        let mut second = validator.validate(&sub);
        second.validated_at = first.validated_at;
        assert_eq!(first, second);
    }

    #[test]
    fn stages_run_in_fixed_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"mysql": "2.18.1"}}"#,
        )
        .unwrap();
        let (validator, runner) = scripted_validator(
            Reply::stdout(0, "[]"),
            Reply::stdout(0, r#"{"vulnerabilities": {}}"#),
        );
        validator.validate(&submission(&dir, SECURE_SQL));
        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], "npx --version");
        assert!(calls[1].starts_with("npx --no-install eslint"));
        assert_eq!(calls[2], "npm --version");
        assert_eq!(calls[3], "npm audit --json --omit=dev");
    }

    #[test]
    fn no_files_still_produces_verdict() {
        let (validator, runner) = scripted_validator(Reply::stdout(0, "[]"), Reply::Unavailable);
        let sub = Submission::new("xss-01", "xss", Vec::<PathBuf>::new(), "el.textContent = name;");
        let result = validator.validate(&sub);
        // 60 + 12.5 + 15
        assert_eq!(result.score, 88);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
