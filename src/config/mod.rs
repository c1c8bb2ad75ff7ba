use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the per-workspace config file.
pub const CONFIG_FILE: &str = ".vulnfix.toml";

/// Top-level configuration from `.vulnfix.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub rules: RulesConfig,
}

/// External tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Run the security linter.
    pub static_analysis: bool,
    /// Run the dependency auditor.
    pub dependency_audit: bool,
    /// Timeout for `--version` availability probes.
    pub probe_timeout_secs: u64,
    pub lint_timeout_secs: u64,
    pub audit_timeout_secs: u64,
    /// Program used to launch the linter.
    pub npx: String,
    /// Program used to run the dependency audit.
    pub npm: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            static_analysis: true,
            dependency_audit: true,
            probe_timeout_secs: 3,
            lint_timeout_secs: 120,
            audit_timeout_secs: 120,
            npx: "npx".into(),
            npm: "npm".into(),
        }
    }
}

impl ToolSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn lint_timeout(&self) -> Duration {
        Duration::from_secs(self.lint_timeout_secs)
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_secs(self.audit_timeout_secs)
    }
}

/// Extra rule sets and category aliases layered over the built-ins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Challenge category -> rule-set key.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Additional (or replacement) rule sets.
    #[serde(default)]
    pub custom: Vec<CustomRuleSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRuleSet {
    pub category: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub vulnerable: Vec<String>,
    #[serde(default)]
    pub secure: Vec<String>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# vulnfix configuration

[tools]
# Run eslint with eslint-plugin-security against submitted files.
static_analysis = true
# Run `npm audit` when package.json declares runtime dependencies.
dependency_audit = true
probe_timeout_secs = 3
lint_timeout_secs = 120
audit_timeout_secs = 120
# npx = "npx"
# npm = "npm"

# Map challenge categories onto rule sets.
# [rules.aliases]
# "ssrf" = "open-redirect"

# Extra rule sets (regex syntax).
# [[rules.custom]]
# category = "open-redirect"
# display_name = "Open Redirect Prevention"
# vulnerable = ['res\.redirect\(\s*req\.']
# secure = ['allowedHosts\.has\(']
"#
    }
}
