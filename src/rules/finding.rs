use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A security issue reported by one of the validation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityIssue {
    /// Severity level.
    pub severity: Severity,
    /// Human-readable description of the issue.
    pub message: String,
    /// Stage-specific details. Serialized with a `type` tag.
    #[serde(flatten)]
    pub detail: IssueDetail,
}

impl SecurityIssue {
    pub fn kind(&self) -> IssueKind {
        match self.detail {
            IssueDetail::Vulnerability { .. } => IssueKind::Vulnerability,
            IssueDetail::StaticAnalysis { .. } => IssueKind::StaticAnalysis,
            IssueDetail::Dependency { .. } => IssueKind::Dependency,
        }
    }

    /// Line number of the issue, if the stage could attribute one.
    pub fn line(&self) -> Option<usize> {
        match &self.detail {
            IssueDetail::Vulnerability { line, .. } | IssueDetail::StaticAnalysis { line, .. } => {
                *line
            }
            IssueDetail::Dependency { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IssueDetail {
    /// A vulnerable pattern matched the submitted source.
    Vulnerability {
        pattern: String,
        matches: Vec<String>,
        line: Option<usize>,
    },
    /// A security diagnostic from the external linter.
    StaticAnalysis {
        rule_id: String,
        file: Option<PathBuf>,
        line: Option<usize>,
    },
    /// A vulnerable package reported by the dependency auditor.
    Dependency {
        package: String,
        title: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    Vulnerability,
    StaticAnalysis,
    Dependency,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vulnerability => write!(f, "vulnerability"),
            Self::StaticAnalysis => write!(f, "static-analysis"),
            Self::Dependency => write!(f, "dependency"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse severities as written by linters and auditors.
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "low" => Some(Self::Low),
            "medium" | "moderate" | "med" | "warning" | "warn" => Some(Self::Medium),
            "high" | "critical" | "crit" | "error" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Outcome of one validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    /// The stage could only run partially (tool missing, timed out, bad output).
    #[serde(default)]
    pub partial: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationCheck {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            partial: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            partial: false,
            message: message.into(),
            details: None,
        }
    }

    /// A stage that degraded to partial credit. Counts as passed so a missing
    /// tool never reads as a failed fix.
    pub fn partial(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            partial: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
