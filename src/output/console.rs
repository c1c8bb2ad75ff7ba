use crate::fallback::FallbackVerdict;
use crate::rules::{IssueDetail, SecurityIssue, Severity};
use crate::validator::ValidationResult;

/// Render a result as a plain-text report: summary, checks, issues
/// (highest severity first), recommendations.
pub fn render(result: &ValidationResult) -> String {
    let mut output = String::new();

    let status = if result.passed { "PASSED" } else { "FAILED" };
    output.push_str(&format!(
        "\n  {} ({})\n  Score: {}/{}  Grade: {}  Status: {}\n",
        result.challenge_id, result.category, result.score, result.max_score, result.grade, status
    ));
    if result.is_partial() {
        output.push_str("  Note: some checks could only be partially performed.\n");
    }

    output.push_str("\n  Checks:\n");
    for check in &result.checks {
        let tag = match (check.passed, check.partial) {
            (_, true) => "[PARTIAL]",
            (true, false) => "[PASS]   ",
            (false, false) => "[FAIL]   ",
        };
        output.push_str(&format!("  {} {}: {}\n", tag, check.name, check.message));
    }

    if !result.issues.is_empty() {
        let mut sorted: Vec<&SecurityIssue> = result.issues.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

        output.push_str(&format!("\n  {} security issue(s):\n", result.issues.len()));
        for issue in sorted {
            let severity_tag = match issue.severity {
                Severity::High => "[HIGH]  ",
                Severity::Medium => "[MEDIUM]",
                Severity::Low => "[LOW]   ",
            };
            output.push_str(&format!(
                "  {} {} {}\n",
                severity_tag,
                issue.kind(),
                issue.message
            ));
            if let Some(location) = location(issue) {
                output.push_str(&format!("           at {}\n", location));
            }
        }
    }

    if !result.recommendations.is_empty() {
        output.push_str("\n  Recommendations:\n");
        for recommendation in &result.recommendations {
            output.push_str(&format!("  - {}\n", recommendation));
        }
    }

    output.push('\n');
    output
}

fn location(issue: &SecurityIssue) -> Option<String> {
    match &issue.detail {
        IssueDetail::Vulnerability { pattern, line, .. } => Some(match line {
            Some(line) => format!("line {} (pattern {})", line, pattern),
            None => format!("pattern {}", pattern),
        }),
        IssueDetail::StaticAnalysis {
            rule_id,
            file,
            line,
        } => {
            let file = file
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_else(|| "-".into());
            let line = line.map(|l| format!(":{l}")).unwrap_or_default();
            Some(format!("{file}{line} ({rule_id})"))
        }
        IssueDetail::Dependency { package, .. } => Some(format!("package {package}")),
    }
}

/// Render the short message shown when only the simplified check ran.
pub fn render_degraded(verdict: &FallbackVerdict) -> String {
    let status = if verdict.passed { "PASSED" } else { "NOT VERIFIED" };
    format!("\n  Basic check: {}\n  {}\n\n", status, verdict.message)
}
