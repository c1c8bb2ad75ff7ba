//! Challenge data handed to the validator, and the attempt lifecycle around it.

pub mod attempt;
pub mod session;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use attempt::{Attempt, AttemptStatus, ProgressRecord};
pub use session::{CheckOutcome, Session};

/// A training challenge as authored by the content collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Files scaffolded into the workspace for the user to edit.
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub attack_vectors: Vec<String>,
}

impl Challenge {
    /// Paths of this challenge's files inside `workspace`.
    pub fn file_paths(&self, workspace: &Path) -> Vec<PathBuf> {
        self.files.iter().map(|f| workspace.join(&f.path)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSpec {
    /// Path relative to the challenge workspace.
    pub path: PathBuf,
    /// Initial (vulnerable) content.
    #[serde(default)]
    pub template: String,
}

/// What the validator sees of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub challenge_id: String,
    pub category: String,
    pub file_paths: Vec<PathBuf>,
    /// All file contents joined with newlines.
    pub content: String,
    /// Challenge workspace root. When unset, tools run in the deepest
    /// directory containing every submitted file.
    pub workspace: Option<PathBuf>,
}

impl Submission {
    pub fn new(
        challenge_id: impl Into<String>,
        category: impl Into<String>,
        file_paths: Vec<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            challenge_id: challenge_id.into(),
            category: category.into(),
            file_paths,
            content: content.into(),
            workspace: None,
        }
    }

    pub fn with_workspace(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace = Some(root.into());
        self
    }

    /// Read the submitted files. A missing or unreadable file counts as
    /// empty so validation can still run on the rest.
    pub fn read(
        challenge_id: impl Into<String>,
        category: impl Into<String>,
        file_paths: Vec<PathBuf>,
    ) -> Self {
        let content = file_paths
            .iter()
            .map(|path| match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "submitted file unreadable, treating as empty");
                    String::new()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(challenge_id, category, file_paths, content)
    }

    pub fn from_challenge(challenge: &Challenge, workspace: &Path) -> Self {
        Self::read(
            &challenge.id,
            &challenge.category,
            challenge.file_paths(workspace),
        )
        .with_workspace(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_joins_files_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        std::fs::write(&a, "const a = 1;").unwrap();
        std::fs::write(&b, "const b = 2;").unwrap();
        let missing = dir.path().join("gone.js");

        let sub = Submission::read("c1", "xss", vec![a, missing, b]);
        assert_eq!(sub.content, "const a = 1;\n\nconst b = 2;");
        assert_eq!(sub.file_paths.len(), 3);
    }

    #[test]
    fn challenge_deserializes_with_optional_fields() {
        let challenge: Challenge = serde_json::from_str(
            r#"{
                "id": "sqli-01",
                "category": "sql-injection-basic",
                "title": "Login bypass",
                "files": [{"path": "src/login.js", "template": "db.query(q)"}]
            }"#,
        )
        .unwrap();
        assert!(challenge.hints.is_empty());
        assert_eq!(
            challenge.file_paths(Path::new("/ws")),
            vec![PathBuf::from("/ws/src/login.js")]
        );
    }

    #[test]
    fn from_challenge_reads_workspace_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/login.js"), "db.query(q, [u]);").unwrap();
        let challenge = Challenge {
            id: "sqli-01".into(),
            category: "sql-injection".into(),
            title: "Login bypass".into(),
            description: String::new(),
            files: vec![FileSpec {
                path: "src/login.js".into(),
                template: String::new(),
            }],
            hints: vec![],
            learning_objectives: vec![],
            attack_vectors: vec![],
        };
        let sub = Submission::from_challenge(&challenge, dir.path());
        assert_eq!(sub.content, "db.query(q, [u]);");
        assert_eq!(sub.challenge_id, "sqli-01");
        assert_eq!(sub.workspace.as_deref(), Some(dir.path()));
    }
}
