//! `npm audit --json` invocation and report parsing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{Invocation, ToolFailure};
use crate::config::ToolSettings;
use crate::rules::Severity;

/// A package the auditor reported as vulnerable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulnerablePackage {
    pub name: String,
    pub severity: Severity,
    pub title: Option<String>,
}

/// True when the manifest declares runtime dependencies. Dev-only
/// manifests (such as the one written for the linter) have nothing to audit.
pub fn declares_runtime_dependencies(manifest: &Value) -> bool {
    manifest
        .get("dependencies")
        .and_then(Value::as_object)
        .is_some_and(|deps| !deps.is_empty())
}

pub fn invocation(settings: &ToolSettings, root: &Path) -> Invocation {
    Invocation::new(&settings.npm, settings.audit_timeout())
        .args(["audit", "--json", "--omit=dev"])
        .current_dir(root)
}

#[derive(Debug, Deserialize)]
struct AuditReport {
    #[serde(default)]
    vulnerabilities: BTreeMap<String, AuditEntry>,
    #[serde(default)]
    error: Option<AuditError>,
}

#[derive(Debug, Deserialize)]
struct AuditEntry {
    severity: String,
    #[serde(default)]
    title: Option<String>,
    /// Advisory objects, or names of the packages it is vulnerable through.
    #[serde(default)]
    via: Vec<Value>,
}

impl AuditEntry {
    fn title(&self) -> Option<String> {
        self.title.clone().or_else(|| {
            self.via
                .iter()
                .find_map(|v| v.get("title").and_then(Value::as_str))
                .map(str::to_string)
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuditError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse `npm audit --json`. npm exits non-zero when it finds
/// vulnerabilities, so only the JSON body decides success.
pub fn parse_report(stdout: &str) -> Result<Vec<VulnerablePackage>, ToolFailure> {
    let malformed = |message: String| ToolFailure::MalformedOutput {
        tool: "npm audit".into(),
        message,
    };

    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty output".into()));
    }
    let report: AuditReport =
        serde_json::from_str(trimmed).map_err(|e| malformed(e.to_string()))?;

    if let Some(error) = report.error {
        return Err(malformed(format!(
            "{}: {}",
            error.code.as_deref().unwrap_or("error"),
            error.summary.as_deref().unwrap_or("audit failed"),
        )));
    }

    Ok(report
        .vulnerabilities
        .into_iter()
        .map(|(name, entry)| VulnerablePackage {
            severity: Severity::from_str_lenient(&entry.severity).unwrap_or(Severity::Medium),
            title: entry.title(),
            name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_npm7_report() {
        let stdout = r#"{
          "auditReportVersion": 2,
          "vulnerabilities": {
            "lodash": {
              "name": "lodash",
              "severity": "critical",
              "isDirect": true,
              "via": [{"source": 1096305, "name": "lodash", "title": "Prototype Pollution in lodash", "severity": "critical"}],
              "range": "<4.17.12"
            },
            "minimist": {
              "name": "minimist",
              "severity": "moderate",
              "via": ["mkdirp"]
            }
          },
          "metadata": {"vulnerabilities": {"total": 2}}
        }"#;
        let packages = parse_report(stdout).unwrap();
        assert_eq!(
            packages,
            vec![
                VulnerablePackage {
                    name: "lodash".into(),
                    severity: Severity::High,
                    title: Some("Prototype Pollution in lodash".into()),
                },
                VulnerablePackage {
                    name: "minimist".into(),
                    severity: Severity::Medium,
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn clean_report_has_no_packages() {
        let stdout = r#"{"auditReportVersion": 2, "vulnerabilities": {}, "metadata": {}}"#;
        assert!(parse_report(stdout).unwrap().is_empty());
    }

    #[test]
    fn missing_lockfile_is_a_failure() {
        let stdout = r#"{"error": {"code": "ENOLOCK", "summary": "This command requires an existing lockfile."}}"#;
        let err = parse_report(stdout).unwrap_err();
        assert!(err.to_string().contains("ENOLOCK"), "{err}");
    }

    #[test]
    fn runtime_dependency_detection() {
        assert!(declares_runtime_dependencies(
            &json!({"dependencies": {"express": "^4.18.2"}})
        ));
        assert!(!declares_runtime_dependencies(
            &json!({"devDependencies": {"eslint": "^8.57.0"}})
        ));
        assert!(!declares_runtime_dependencies(&json!({"dependencies": {}})));
    }
}
