use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TrainerError};
use crate::rules::Grade;
use crate::validator::ValidationResult;

/// Lifecycle of one attempt. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::InProgress => write!(f, "in progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// One user's pass through a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub challenge_id: String,
    pub status: AttemptStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of checks recorded against this attempt.
    pub checks: u32,
    pub best_score: Option<u32>,
}

impl Attempt {
    pub fn new(challenge_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            challenge_id: challenge_id.into(),
            status: AttemptStatus::NotStarted,
            started_at: None,
            completed_at: None,
            checks: 0,
            best_score: None,
        }
    }

    /// not_started -> in_progress. Starting an in-progress attempt is a no-op.
    pub fn start(&mut self) -> Result<()> {
        match self.status {
            AttemptStatus::NotStarted => {
                self.status = AttemptStatus::InProgress;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            AttemptStatus::InProgress => Ok(()),
            AttemptStatus::Completed => Err(self.closed()),
        }
    }

    /// Record a check. A passing result completes the attempt; a failing one
    /// leaves it in progress.
    pub fn record(&mut self, passed: bool, score: u32) -> Result<AttemptStatus> {
        self.start()?;
        self.checks += 1;
        self.best_score = Some(self.best_score.map_or(score, |best| best.max(score)));
        if passed {
            self.status = AttemptStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
        Ok(self.status)
    }

    /// A fresh attempt at the same challenge. The current one is untouched.
    pub fn restart(&self) -> Attempt {
        let mut next = Attempt::new(self.challenge_id.clone());
        next.status = AttemptStatus::InProgress;
        next.started_at = Some(Utc::now());
        next
    }

    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    fn closed(&self) -> TrainerError {
        TrainerError::AttemptClosed {
            attempt_id: self.id.to_string(),
        }
    }
}

/// The slice of a result the progress tracker persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub challenge_id: String,
    pub passed: bool,
    pub score: u32,
    pub grade: Grade,
    pub recorded_at: DateTime<Utc>,
}

impl From<&ValidationResult> for ProgressRecord {
    fn from(result: &ValidationResult) -> Self {
        Self {
            challenge_id: result.challenge_id.clone(),
            passed: result.passed,
            score: result.score,
            grade: result.grade,
            recorded_at: result.validated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_checks_keep_attempt_in_progress() {
        let mut attempt = Attempt::new("sqli-01");
        assert_eq!(attempt.status, AttemptStatus::NotStarted);
        attempt.start().unwrap();
        assert_eq!(attempt.record(false, 55).unwrap(), AttemptStatus::InProgress);
        assert_eq!(attempt.record(false, 70).unwrap(), AttemptStatus::InProgress);
        assert_eq!(attempt.checks, 2);
        assert_eq!(attempt.best_score, Some(70));
        assert!(attempt.completed_at.is_none());
    }

    #[test]
    fn passing_check_completes_and_closes() {
        let mut attempt = Attempt::new("sqli-01");
        attempt.start().unwrap();
        assert_eq!(attempt.record(true, 92).unwrap(), AttemptStatus::Completed);
        assert!(attempt.completed_at.is_some());

        let err = attempt.record(true, 100).unwrap_err();
        assert!(matches!(err, TrainerError::AttemptClosed { .. }));
        assert!(attempt.start().is_err());
        assert_eq!(attempt.checks, 1);
    }

    #[test]
    fn restart_creates_new_attempt() {
        let mut attempt = Attempt::new("xss-02");
        attempt.record(true, 85).unwrap();
        let next = attempt.restart();
        assert_ne!(next.id, attempt.id);
        assert_eq!(next.status, AttemptStatus::InProgress);
        assert_eq!(next.checks, 0);
        assert!(attempt.is_completed());
    }
}
