pub mod builtin;
pub mod finding;
pub mod policy;

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;
use crate::error::{Result, TrainerError};

pub use finding::{IssueDetail, IssueKind, SecurityIssue, Severity, ValidationCheck};
pub use policy::Grade;

/// A compiled indicator pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: String,
    pub description: String,
    pub regex: Regex,
}

impl Pattern {
    pub fn compile(category: &str, id: &str, source: &str, description: &str) -> Result<Self> {
        let regex = Regex::new(source).map_err(|e| TrainerError::Rule {
            category: category.to_string(),
            message: format!("pattern '{id}' does not compile: {e}"),
        })?;
        Ok(Self {
            id: id.to_string(),
            description: description.to_string(),
            regex,
        })
    }
}

/// Vulnerable and secure indicators for one category.
#[derive(Debug, Clone)]
pub struct PatternRuleSet {
    pub category: String,
    pub display_name: String,
    pub recommendation: Option<String>,
    pub vulnerable: Vec<Pattern>,
    pub secure: Vec<Pattern>,
}

impl PatternRuleSet {
    fn from_builtin(set: &builtin::BuiltinRuleSet) -> Result<Self> {
        let compile = |defs: &[builtin::PatternDef]| -> Result<Vec<Pattern>> {
            defs.iter()
                .map(|d| Pattern::compile(set.category, d.id, d.regex, d.description))
                .collect()
        };
        Ok(Self {
            category: set.category.to_string(),
            display_name: set.display_name.to_string(),
            recommendation: Some(set.recommendation.to_string()),
            vulnerable: compile(set.vulnerable)?,
            secure: compile(set.secure)?,
        })
    }

    fn from_custom(custom: &crate::config::CustomRuleSet) -> Result<Self> {
        let compile = |sources: &[String]| -> Result<Vec<Pattern>> {
            sources
                .iter()
                .map(|s| Pattern::compile(&custom.category, s, s, s))
                .collect()
        };
        Ok(Self {
            category: custom.category.clone(),
            display_name: custom
                .display_name
                .clone()
                .unwrap_or_else(|| custom.category.clone()),
            recommendation: custom.recommendation.clone(),
            vulnerable: compile(&custom.vulnerable)?,
            secure: compile(&custom.secure)?,
        })
    }
}

/// How a challenge category was mapped onto a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    Exact,
    Alias,
    /// Category extends a known key, e.g. `sql-injection-basic`.
    Prefix,
    /// Nothing matched; the default rule set was used.
    Fallback,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub rule_set: &'a PatternRuleSet,
    pub via: ResolvedVia,
}

/// Summary of a rule set, used for `vulnfix rules` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetMetadata {
    pub category: String,
    pub display_name: String,
    pub vulnerable_patterns: Vec<String>,
    pub secure_patterns: Vec<String>,
    pub aliases: Vec<String>,
}

static BUILTIN: Lazy<Arc<RuleRegistry>> = Lazy::new(|| {
    let rule_sets = builtin::all_rule_sets()
        .into_iter()
        .map(PatternRuleSet::from_builtin)
        .collect::<Result<Vec<_>>>()
        .unwrap_or_else(|e| panic!("built-in rule table is invalid: {e}"));
    let aliases = builtin::ALIASES
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect();
    Arc::new(RuleRegistry {
        rule_sets,
        aliases,
        default_category: builtin::DEFAULT_CATEGORY.to_string(),
    })
});

/// Immutable table of rule sets keyed by category, plus the alias table.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rule_sets: Vec<PatternRuleSet>,
    aliases: BTreeMap<String, String>,
    default_category: String,
}

impl RuleRegistry {
    /// The process-wide built-in registry.
    pub fn builtin() -> Arc<RuleRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Built-in registry extended with custom rule sets and aliases from config.
    pub fn with_config(config: &RulesConfig) -> Result<Arc<RuleRegistry>> {
        if config.custom.is_empty() && config.aliases.is_empty() {
            return Ok(Self::builtin());
        }

        let mut registry = (**BUILTIN).clone();
        for custom in &config.custom {
            let set = PatternRuleSet::from_custom(custom)?;
            match registry
                .rule_sets
                .iter_mut()
                .find(|s| s.category == set.category)
            {
                Some(existing) => *existing = set,
                None => registry.rule_sets.push(set),
            }
        }
        for (alias, target) in &config.aliases {
            if registry.lookup(target).is_none() {
                return Err(TrainerError::Rule {
                    category: alias.clone(),
                    message: format!("alias points at unknown rule set '{target}'"),
                });
            }
            registry.aliases.insert(alias.clone(), target.clone());
        }
        Ok(Arc::new(registry))
    }

    /// Exact lookup by rule-set key.
    pub fn lookup(&self, category: &str) -> Option<&PatternRuleSet> {
        self.rule_sets.iter().find(|s| s.category == category)
    }

    /// Resolve a challenge category: exact key, alias, key or alias prefix,
    /// then the default rule set. Returns `None` only for an empty registry.
    pub fn resolve(&self, category: &str) -> Option<Resolution<'_>> {
        let category = category.trim().to_lowercase();

        if let Some(rule_set) = self.lookup(&category) {
            return Some(Resolution {
                rule_set,
                via: ResolvedVia::Exact,
            });
        }
        if let Some(rule_set) = self.aliases.get(&category).and_then(|t| self.lookup(t)) {
            return Some(Resolution {
                rule_set,
                via: ResolvedVia::Alias,
            });
        }
        if let Some(rule_set) = self.resolve_prefix(&category) {
            return Some(Resolution {
                rule_set,
                via: ResolvedVia::Prefix,
            });
        }

        let rule_set = self
            .lookup(&self.default_category)
            .or_else(|| self.rule_sets.first())?;
        Some(Resolution {
            rule_set,
            via: ResolvedVia::Fallback,
        })
    }

    /// Longest key or alias that `category` extends with a `-` suffix.
    fn resolve_prefix(&self, category: &str) -> Option<&PatternRuleSet> {
        let extends = |key: &str| {
            category
                .strip_prefix(key)
                .is_some_and(|rest| rest.starts_with('-'))
        };

        let keys = self
            .rule_sets
            .iter()
            .map(|s| (s.category.as_str(), s.category.as_str()));
        let aliases = self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()));

        keys.chain(aliases)
            .filter(|(key, _)| extends(key))
            .max_by_key(|(key, _)| key.len())
            .and_then(|(_, target)| self.lookup(target))
    }

    /// Categories that would only resolve through the default fallback.
    pub fn unresolved<'a, I>(&self, categories: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        categories
            .into_iter()
            .filter(|c| {
                self.resolve(c)
                    .map_or(true, |r| r.via == ResolvedVia::Fallback)
            })
            .map(str::to_string)
            .collect()
    }

    /// Metadata for every registered rule set.
    pub fn list(&self) -> Vec<RuleSetMetadata> {
        self.rule_sets
            .iter()
            .map(|s| RuleSetMetadata {
                category: s.category.clone(),
                display_name: s.display_name.clone(),
                vulnerable_patterns: s.vulnerable.iter().map(|p| p.id.clone()).collect(),
                secure_patterns: s.secure.iter().map(|p| p.id.clone()).collect(),
                aliases: self
                    .aliases
                    .iter()
                    .filter(|(_, target)| **target == s.category)
                    .map(|(alias, _)| alias.clone())
                    .collect(),
            })
            .collect()
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }
}
