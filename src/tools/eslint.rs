//! ESLint with `eslint-plugin-security`: workspace setup, invocation and
//! report parsing.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Invocation, ToolFailure};
use crate::config::ToolSettings;
use crate::error::{Result, TrainerError};
use crate::rules::Severity;

/// Security-profile config written into the workspace.
pub const CONFIG_FILE: &str = ".eslintrc.security.json";

pub const MANIFEST_FILE: &str = "package.json";

/// Dev dependencies the linter needs in the workspace manifest.
pub const DEV_DEPENDENCIES: &[(&str, &str)] =
    &[("eslint", "^8.57.0"), ("eslint-plugin-security", "^1.7.1")];

/// Core rules that are security findings even without the plugin prefix.
const CORE_SECURITY_RULES: &[&str] = &["no-eval", "no-implied-eval", "no-new-func", "no-script-url"];

/// What [`ensure_setup`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub wrote_config: bool,
    pub created_manifest: bool,
    pub added_dev_dependencies: bool,
}

/// One linter diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: Option<usize>,
    pub rule_id: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn is_security(&self) -> bool {
        self.rule_id.as_deref().is_some_and(is_security_rule)
    }
}

pub fn is_security_rule(rule_id: &str) -> bool {
    rule_id.starts_with("security/") || CORE_SECURITY_RULES.contains(&rule_id)
}

fn default_config() -> Value {
    json!({
        "root": true,
        "env": { "browser": true, "node": true, "es2022": true },
        "parserOptions": { "ecmaVersion": "latest", "sourceType": "module" },
        "plugins": ["security"],
        "extends": ["plugin:security/recommended"],
        "rules": {
            "no-eval": "error",
            "no-implied-eval": "error",
            "no-new-func": "error",
            "no-script-url": "error"
        }
    })
}

/// Make the workspace lintable: write the security config if absent and
/// make sure the manifest lists the linter as dev dependencies. Idempotent;
/// never touches an existing config file.
pub fn ensure_setup(root: &Path) -> Result<SetupReport> {
    let mut report = SetupReport::default();

    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        std::fs::write(&config_path, serde_json::to_string_pretty(&default_config())?)?;
        report.wrote_config = true;
    }

    let manifest_path = root.join(MANIFEST_FILE);
    let mut manifest = if manifest_path.exists() {
        let content = std::fs::read_to_string(&manifest_path)?;
        serde_json::from_str::<Value>(&content).map_err(|e| TrainerError::Manifest {
            path: manifest_path.display().to_string(),
            message: e.to_string(),
        })?
    } else {
        report.created_manifest = true;
        json!({
            "name": package_name(root),
            "version": "1.0.0",
            "private": true
        })
    };

    let object = manifest
        .as_object_mut()
        .ok_or_else(|| TrainerError::Manifest {
            path: manifest_path.display().to_string(),
            message: "top-level value is not an object".into(),
        })?;
    report.added_dev_dependencies = add_dev_dependencies(object).map_err(|message| {
        TrainerError::Manifest {
            path: manifest_path.display().to_string(),
            message,
        }
    })?;

    if report.created_manifest || report.added_dev_dependencies {
        let mut content = serde_json::to_string_pretty(&manifest)?;
        content.push('\n');
        std::fs::write(&manifest_path, content)?;
    }

    Ok(report)
}

fn add_dev_dependencies(manifest: &mut Map<String, Value>) -> std::result::Result<bool, String> {
    let dev = manifest
        .entry("devDependencies")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| "devDependencies is not an object".to_string())?;

    let mut added = false;
    for (name, version) in DEV_DEPENDENCIES {
        if !dev.contains_key(*name) {
            dev.insert(name.to_string(), Value::String(version.to_string()));
            added = true;
        }
    }
    Ok(added)
}

/// npm package names are lowercase without spaces.
fn package_name(root: &Path) -> String {
    let name: String = root
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches('-');
    if name.is_empty() {
        "vulnfix-challenge".into()
    } else {
        name.to_string()
    }
}

/// `npx --no-install eslint ...` restricted to the security profile.
pub fn invocation(settings: &ToolSettings, root: &Path, files: &[PathBuf]) -> Invocation {
    Invocation::new(&settings.npx, settings.lint_timeout())
        .args(["--no-install", "eslint", "--no-eslintrc", "-c", CONFIG_FILE])
        .args(["--format", "json"])
        .args(files.iter().map(|f| f.display().to_string()))
        .current_dir(root)
        .env("ESLINT_USE_FLAT_CONFIG", "false")
}

#[derive(Debug, Deserialize)]
struct FileReport {
    #[serde(rename = "filePath")]
    file_path: PathBuf,
    #[serde(default)]
    messages: Vec<LintMessage>,
}

#[derive(Debug, Deserialize)]
struct LintMessage {
    #[serde(rename = "ruleId")]
    rule_id: Option<String>,
    severity: u8,
    message: String,
    line: Option<usize>,
}

/// Parse `--format json` output. ESLint exits 1 when it finds problems, so
/// the exit code is not consulted; unparseable stdout is the failure signal.
pub fn parse_report(stdout: &str) -> std::result::Result<Vec<Diagnostic>, ToolFailure> {
    let malformed = |message: String| ToolFailure::MalformedOutput {
        tool: "eslint".into(),
        message,
    };

    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty output".into()));
    }
    let reports: Vec<FileReport> =
        serde_json::from_str(trimmed).map_err(|e| malformed(e.to_string()))?;

    Ok(reports
        .into_iter()
        .flat_map(|report| {
            let file = report.file_path;
            report.messages.into_iter().map(move |m| Diagnostic {
                file: file.clone(),
                line: m.line,
                rule_id: m.rule_id,
                message: m.message,
                severity: if m.severity >= 2 {
                    Severity::High
                } else {
                    Severity::Medium
                },
            })
        })
        .collect())
}
