//! Pattern stage: counts vulnerable and secure indicators for the
//! challenge category and scores them out of 60.

use serde_json::json;

use super::{Stage, StageOutcome};
use crate::rules::policy::{
    penalized, PATTERN_MAX, PATTERN_NO_EVIDENCE_FACTOR, PATTERN_PENALTY,
};
use crate::rules::{
    IssueDetail, Pattern, ResolvedVia, RuleRegistry, SecurityIssue, Severity, ValidationCheck,
};

/// Check name used when no rule set resolves.
pub const CHECK_NAME: &str = "Pattern Validation";

/// Match counts for one source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternCounts {
    pub vulnerable: usize,
    pub secure: usize,
}

/// Three-tier policy: full marks need no vulnerable matches and visible
/// secure evidence; removing the bad idiom alone earns 70%; each
/// vulnerable match costs a fixed penalty.
pub fn sub_score(counts: PatternCounts) -> f64 {
    match counts {
        PatternCounts { vulnerable: 0, secure } if secure > 0 => PATTERN_MAX,
        PatternCounts { vulnerable: 0, .. } => PATTERN_MAX * PATTERN_NO_EVIDENCE_FACTOR,
        PatternCounts { vulnerable, .. } => penalized(PATTERN_MAX, PATTERN_PENALTY, vulnerable),
    }
}

/// Run the pattern stage for `category` against the submitted source.
pub fn evaluate(registry: &RuleRegistry, category: &str, source: &str) -> StageOutcome {
    let Some(resolution) = registry.resolve(category) else {
        tracing::warn!(category, "no rule set available");
        return StageOutcome::new(
            Stage::Pattern,
            0.0,
            PATTERN_MAX,
            ValidationCheck::fail(CHECK_NAME, format!("No pattern rules for category '{category}'")),
        );
    };
    let rule_set = resolution.rule_set;
    if resolution.via == ResolvedVia::Fallback {
        tracing::warn!(
            category,
            rule_set = %rule_set.category,
            "unknown category, using default rule set"
        );
    }

    let mut counts = PatternCounts::default();
    let mut issues = Vec::new();

    for pattern in &rule_set.vulnerable {
        let found = find_matches(pattern, source);
        if found.is_empty() {
            continue;
        }
        counts.vulnerable += found.len();
        issues.push(SecurityIssue {
            severity: Severity::High,
            message: format!("{} ({} occurrence(s))", pattern.description, found.len()),
            detail: IssueDetail::Vulnerability {
                pattern: pattern.id.clone(),
                line: found.first().map(|(line, _)| *line),
                matches: found.into_iter().map(|(_, text)| text).collect(),
            },
        });
    }

    counts.secure = rule_set
        .secure
        .iter()
        .map(|p| p.regex.find_iter(source).count())
        .sum();

    let score = sub_score(counts);
    tracing::debug!(
        rule_set = %rule_set.category,
        vulnerable = counts.vulnerable,
        secure = counts.secure,
        score,
        "pattern stage"
    );

    let passed = counts.vulnerable == 0;
    let message = match (counts.vulnerable, counts.secure) {
        (0, 0) => "No vulnerable patterns found, but no recognised secure idiom either".to_string(),
        (0, secure) => format!("No vulnerable patterns found; {secure} secure idiom(s) detected"),
        (vulnerable, _) => format!("{vulnerable} vulnerable pattern match(es) found"),
    };
    let check = if passed {
        ValidationCheck::pass(&rule_set.display_name, message)
    } else {
        ValidationCheck::fail(&rule_set.display_name, message)
    }
    .with_details(json!({
        "category": category,
        "rule_set": rule_set.category,
        "resolved_via": resolution.via,
        "vulnerable_count": counts.vulnerable,
        "secure_count": counts.secure,
    }));

    let outcome = StageOutcome::new(Stage::Pattern, score, PATTERN_MAX, check).with_issues(issues);
    match &rule_set.recommendation {
        Some(recommendation) if counts.vulnerable > 0 || counts.secure == 0 => {
            outcome.recommend(recommendation.clone())
        }
        _ => outcome,
    }
}

/// Non-overlapping matches as (1-based line, matched text).
fn find_matches(pattern: &Pattern, source: &str) -> Vec<(usize, String)> {
    pattern
        .regex
        .find_iter(source)
        .map(|m| {
            let line = source[..m.start()].matches('\n').count() + 1;
            (line, m.as_str().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(category: &str, source: &str) -> StageOutcome {
        evaluate(&RuleRegistry::builtin(), category, source)
    }

    #[test]
    fn concatenated_query_fails() {
        let outcome = run(
            "sql-injection-basic",
            r#"const query = "SELECT * FROM users WHERE username = '" + username + "'";"#,
        );
        assert!(!outcome.check.passed);
        assert!(outcome.sub_score < 60.0);
        assert_eq!(outcome.sub_score, 40.0);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].severity, Severity::High);
        assert_eq!(outcome.issues[0].line(), Some(1));
        assert_eq!(outcome.check.name, "SQL Injection Prevention");
    }

    #[test]
    fn bare_placeholder_earns_partial_credit() {
        let outcome = run(
            "sql-injection-basic",
            r#"const query = "SELECT * FROM users WHERE username = ?";"#,
        );
        assert!(outcome.check.passed);
        assert_eq!(outcome.sub_score, 42.0);
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.recommendations.len(), 1);
    }

    #[test]
    fn parameter_array_earns_full_credit() {
        let source = "const query = \"SELECT * FROM users WHERE username = ? AND password = ?\";\n\
                      db.query(query, [username, password]);";
        let outcome = run("sql-injection-basic", source);
        assert!(outcome.check.passed);
        assert_eq!(outcome.sub_score, 60.0);
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn each_vulnerable_match_costs_twenty() {
        let source = "const a = \"SELECT * FROM users WHERE id = \" + id;\n\
                      const b = `DELETE FROM users WHERE id = ${id}`;";
        let outcome = run("sql-injection", source);
        assert_eq!(outcome.sub_score, 20.0);
        assert_eq!(outcome.issues.len(), 2);
        assert_eq!(outcome.issues[1].line(), Some(2));
    }

    #[test]
    fn repeated_matches_are_counted_individually() {
        let source = "el.innerHTML = a;\nother.innerHTML = b;\nthird.innerHTML = c;\ndocument.write(d);";
        let outcome = run("xss", source);
        // four matches, one issue per pattern
        assert_eq!(outcome.sub_score, 0.0);
        assert_eq!(outcome.issues.len(), 2);
        match &outcome.issues[0].detail {
            IssueDetail::Vulnerability { matches, .. } => assert_eq!(matches.len(), 3),
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn unknown_category_uses_default_rules() {
        let outcome = run("foo-bar", "db.query(sql, [id]);");
        assert_eq!(outcome.sub_score, 60.0);
        let details = outcome.check.details.unwrap();
        assert_eq!(details["rule_set"], "sql-injection");
        assert_eq!(details["resolved_via"], "fallback");
    }

    #[test]
    fn scoring_tiers() {
        assert_eq!(sub_score(PatternCounts { vulnerable: 0, secure: 3 }), 60.0);
        assert_eq!(sub_score(PatternCounts { vulnerable: 0, secure: 0 }), 42.0);
        assert_eq!(sub_score(PatternCounts { vulnerable: 1, secure: 5 }), 40.0);
        assert_eq!(sub_score(PatternCounts { vulnerable: 3, secure: 0 }), 0.0);
        assert_eq!(sub_score(PatternCounts { vulnerable: 9, secure: 0 }), 0.0);
    }
}
