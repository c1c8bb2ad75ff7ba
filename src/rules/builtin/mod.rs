mod auth;
mod path_traversal;
mod sql_injection;
mod xss;

/// A pattern as written in a built-in table.
#[derive(Debug, Clone, Copy)]
pub struct PatternDef {
    pub id: &'static str,
    pub regex: &'static str,
    pub description: &'static str,
}

/// Static definition of one category's rule set.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRuleSet {
    pub category: &'static str,
    pub display_name: &'static str,
    pub recommendation: &'static str,
    pub vulnerable: &'static [PatternDef],
    pub secure: &'static [PatternDef],
}

/// Category whose rule set is used when nothing else resolves.
pub const DEFAULT_CATEGORY: &str = sql_injection::RULES.category;

/// Returns all built-in rule sets.
pub fn all_rule_sets() -> Vec<&'static BuiltinRuleSet> {
    vec![
        &sql_injection::RULES,
        &xss::RULES,
        &auth::RULES,
        &path_traversal::RULES,
    ]
}

/// Category names used by challenge content that map onto a built-in set.
pub const ALIASES: &[(&str, &str)] = &[
    ("injection", "sql-injection"),
    ("sqli", "sql-injection"),
    ("nosql-injection", "sql-injection"),
    ("cross-site-scripting", "xss"),
    ("broken-auth", "auth"),
    ("broken-access", "auth"),
    ("security-misconfig", "auth"),
    ("authentication", "auth"),
    ("jwt", "auth"),
    ("xxe", "path-traversal"),
    ("directory-traversal", "path-traversal"),
    ("lfi", "path-traversal"),
];

#[cfg(test)]
pub(crate) fn hits(
    set: &BuiltinRuleSet,
    source: &str,
) -> (Vec<&'static str>, Vec<&'static str>) {
    let matching = |defs: &'static [PatternDef]| -> Vec<&'static str> {
        defs.iter()
            .filter(|d| regex::Regex::new(d.regex).unwrap().is_match(source))
            .map(|d| d.id)
            .collect()
    };
    (matching(set.vulnerable), matching(set.secure))
}
