use std::path::PathBuf;

use serde::Serialize;

use super::{Attempt, Challenge, ProgressRecord, Submission};
use crate::config::Config;
use crate::error::{Result, TrainerError};
use crate::fallback::{self, FallbackVerdict};
use crate::validator::{ValidationResult, Validator};

/// What a solution check produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Full validation ran.
    Full {
        result: ValidationResult,
        progress: ProgressRecord,
    },
    /// The validator could not be built; only the simplified check ran.
    Degraded { verdict: FallbackVerdict },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        match self {
            Self::Full { result, .. } => result.passed,
            Self::Degraded { verdict } => verdict.passed,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveChallenge {
    challenge_id: String,
    category: String,
    workspace: Option<PathBuf>,
    files: Vec<PathBuf>,
    attempt: Attempt,
}

/// The single active challenge of a user session.
#[derive(Debug, Default)]
pub struct Session {
    active: Option<ActiveChallenge>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an attempt, replacing whatever was active. The workspace is
    /// derived from the files.
    pub fn start(
        &mut self,
        challenge_id: impl Into<String>,
        category: impl Into<String>,
        files: Vec<PathBuf>,
    ) -> Result<&Attempt> {
        self.begin(challenge_id.into(), category.into(), None, files)
    }

    /// Begin an attempt whose files live under a known workspace root.
    pub fn start_in(
        &mut self,
        challenge_id: impl Into<String>,
        category: impl Into<String>,
        workspace: impl Into<PathBuf>,
        files: Vec<PathBuf>,
    ) -> Result<&Attempt> {
        self.begin(
            challenge_id.into(),
            category.into(),
            Some(workspace.into()),
            files,
        )
    }

    fn begin(
        &mut self,
        challenge_id: String,
        category: String,
        workspace: Option<PathBuf>,
        files: Vec<PathBuf>,
    ) -> Result<&Attempt> {
        let mut attempt = Attempt::new(challenge_id.clone());
        attempt.start()?;
        let active = self.active.insert(ActiveChallenge {
            challenge_id,
            category,
            workspace,
            files,
            attempt,
        });
        Ok(&active.attempt)
    }

    pub fn start_challenge(
        &mut self,
        challenge: &Challenge,
        workspace: &std::path::Path,
    ) -> Result<&Attempt> {
        self.start_in(
            &challenge.id,
            &challenge.category,
            workspace,
            challenge.file_paths(workspace),
        )
    }

    /// Replace the active attempt with a fresh one for the same challenge.
    pub fn restart(&mut self) -> Result<&Attempt> {
        let active = self.active.as_mut().ok_or(TrainerError::NoActiveChallenge)?;
        active.attempt = active.attempt.restart();
        Ok(&active.attempt)
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        self.active.as_ref().map(|a| &a.attempt)
    }

    /// Validate the active challenge's files with a validator built from `config`.
    pub fn check_solution(&mut self, config: &Config) -> Result<CheckOutcome> {
        self.check_with(|| Validator::new(config))
    }

    /// Validate with a caller-supplied validator. If it cannot be built, the
    /// simplified fallback check runs instead; it never completes an attempt.
    pub fn check_with<F>(&mut self, build: F) -> Result<CheckOutcome>
    where
        F: FnOnce() -> Result<Validator>,
    {
        let active = self.active.as_mut().ok_or(TrainerError::NoActiveChallenge)?;
        if active.attempt.is_completed() {
            return Err(TrainerError::AttemptClosed {
                attempt_id: active.attempt.id.to_string(),
            });
        }

        let mut submission = Submission::read(
            &active.challenge_id,
            &active.category,
            active.files.clone(),
        );
        submission.workspace = active.workspace.clone();

        match build() {
            Ok(validator) => {
                let result = validator.validate(&submission);
                active.attempt.record(result.passed, result.score)?;
                let progress = ProgressRecord::from(&result);
                Ok(CheckOutcome::Full { result, progress })
            }
            Err(e) => {
                tracing::warn!(error = %e, "validator unavailable, using simplified check");
                let verdict = fallback::check(&submission.category, &submission.content);
                Ok(CheckOutcome::Degraded { verdict })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::challenge::{AttemptStatus, FileSpec};
    use crate::config::CustomRuleSet;
    use crate::tools::testing::{Reply, ScriptedRunner};

    fn validator() -> Result<Validator> {
        let runner = Arc::new(ScriptedRunner::new(Reply::stdout(0, "[]"), Reply::Unavailable));
        Ok(Validator::new(&Config::default())?.with_runner(runner))
    }

    fn workspace(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("login.js");
        std::fs::write(&file, content).unwrap();
        (dir, file)
    }

    #[test]
    fn check_without_challenge_is_an_error() {
        let mut session = Session::new();
        let err = session.check_with(validator).unwrap_err();
        assert!(matches!(err, TrainerError::NoActiveChallenge));
        assert!(session.restart().is_err());
    }

    #[test]
    fn failing_then_passing_check() {
        let (_dir, file) = workspace("db.query(\"SELECT * FROM users WHERE id = '\" + id + \"'\");");
        let mut session = Session::new();
        session.start("sqli-01", "sql-injection", vec![file.clone()]).unwrap();

        // 40 + 12.5 partial lint, 15: below threshold
        let runner = Arc::new(ScriptedRunner::new(Reply::Unavailable, Reply::Unavailable));
        let outcome = session
            .check_with(|| Ok(Validator::new(&Config::default())?.with_runner(runner)))
            .unwrap();
        assert!(!outcome.passed());
        assert_eq!(session.attempt().unwrap().status, AttemptStatus::InProgress);

        std::fs::write(&file, "db.query('SELECT * FROM users WHERE id = ?', [id]);").unwrap();
        let outcome = session.check_with(validator).unwrap();
        assert!(outcome.passed());
        match &outcome {
            CheckOutcome::Full { result, progress } => {
                assert_eq!(progress.score, result.score);
                assert_eq!(progress.challenge_id, "sqli-01");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let attempt = session.attempt().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Completed);
        assert_eq!(attempt.checks, 2);

        assert!(matches!(
            session.check_with(validator),
            Err(TrainerError::AttemptClosed { .. })
        ));
        let restarted = session.restart().unwrap();
        assert_eq!(restarted.status, AttemptStatus::InProgress);
    }

    #[test]
    fn broken_config_falls_back_to_simplified_check() {
        let (_dir, file) = workspace("db.query('SELECT * FROM users WHERE id = ?', [id]);");
        let mut session = Session::new();
        session.start("sqli-01", "sql-injection", vec![file]).unwrap();

        let mut config = Config::default();
        config.rules.custom.push(CustomRuleSet {
            category: "sql-injection".into(),
            display_name: None,
            recommendation: None,
            vulnerable: vec!["[unterminated".into()],
            secure: vec![],
        });
        let outcome = session.check_solution(&config).unwrap();
        match outcome {
            CheckOutcome::Degraded { verdict } => assert!(verdict.passed),
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        // the fallback never completes an attempt
        assert_eq!(session.attempt().unwrap().status, AttemptStatus::InProgress);
    }

    #[test]
    fn nested_sources_audit_the_workspace_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name": "shop", "dependencies": {"lodash": "4.17.4"}}"#,
        )
        .unwrap();
        let challenge = Challenge {
            id: "sqli-02".into(),
            category: "sql-injection".into(),
            title: "Order lookup".into(),
            description: String::new(),
            files: vec![FileSpec {
                path: "src/login.js".into(),
                template: String::new(),
            }],
            hints: vec![],
            learning_objectives: vec![],
            attack_vectors: vec![],
        };
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/login.js"),
            "db.query('SELECT * FROM orders WHERE id = ?', [id]);",
        )
        .unwrap();

        let mut session = Session::new();
        session.start_challenge(&challenge, dir.path()).unwrap();
        let runner = Arc::new(ScriptedRunner::new(
            Reply::stdout(0, "[]"),
            Reply::stdout(
                1,
                r#"{"vulnerabilities": {"lodash": {"severity": "critical", "via": [{"title": "Prototype Pollution"}]}}}"#,
            ),
        ));
        let outcome = session
            .check_with(|| Ok(Validator::new(&Config::default())?.with_runner(runner.clone())))
            .unwrap();

        match outcome {
            CheckOutcome::Full { result, .. } => {
                assert_eq!(result.sub_scores.dependency, Some(12.0));
                assert_eq!(result.score, 97);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(runner.calls().iter().any(|c| c == "npm audit --json --omit=dev"));
        assert!(dir.path().join(crate::tools::eslint::CONFIG_FILE).exists());
        assert!(!dir.path().join("src/package.json").exists());
        assert!(!dir.path().join("src").join(crate::tools::eslint::CONFIG_FILE).exists());
    }

    #[test]
    fn missing_file_validates_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new();
        session
            .start("xss-01", "xss", vec![dir.path().join("missing.js")])
            .unwrap();
        match session.check_with(validator).unwrap() {
            CheckOutcome::Full { result, .. } => {
                assert_eq!(result.sub_scores.pattern, Some(42.0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
