//! The three scoring stages. Each produces a [`StageOutcome`]; the
//! validator sums them.

pub mod dependency_audit;
pub mod pattern;
pub mod static_analysis;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::rules::{SecurityIssue, ValidationCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pattern,
    StaticAnalysis,
    Dependency,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::StaticAnalysis => write!(f, "static analysis"),
            Self::Dependency => write!(f, "dependency"),
        }
    }
}

/// Result of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub sub_score: f64,
    pub max_score: f64,
    pub check: ValidationCheck,
    pub issues: Vec<SecurityIssue>,
    pub recommendations: Vec<String>,
}

impl StageOutcome {
    pub fn new(stage: Stage, sub_score: f64, max_score: f64, check: ValidationCheck) -> Self {
        Self {
            stage,
            sub_score: sub_score.clamp(0.0, max_score),
            max_score,
            check,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn with_issues(mut self, issues: Vec<SecurityIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }
}

/// The directory the submitted files live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

impl Workspace {
    /// Derive the workspace from submitted paths: the deepest directory
    /// containing all of them. `None` when no paths were given.
    pub fn from_files(files: &[PathBuf]) -> Option<Self> {
        let mut parents = files
            .iter()
            .map(|f| f.parent().unwrap_or_else(|| Path::new(".")));
        let first = parents.next()?.to_path_buf();
        let root = parents.fold(first, |acc, dir| common_ancestor(&acc, dir));
        let root = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        Some(Self {
            root,
            files: files.to_vec(),
        })
    }

    /// Use `root` when the caller knows the workspace; otherwise derive it
    /// from the files. `None` when no paths were given.
    pub fn resolve(root: Option<&Path>, files: &[PathBuf]) -> Option<Self> {
        match root {
            Some(root) if !files.is_empty() => Some(Self {
                root: root.to_path_buf(),
                files: files.to_vec(),
            }),
            Some(_) => None,
            None => Self::from_files(files),
        }
    }
}

fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}
