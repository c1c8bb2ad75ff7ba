//! Degraded-mode validator.
//!
//! Plain substring checks per category family, used only when the full
//! validator cannot be constructed. Kept separate so both paths can be
//! tested on their own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    SqlInjection,
    Xss,
    Auth,
    PathTraversal,
}

impl Family {
    /// Guess the family from a category name.
    pub fn from_category(category: &str) -> Option<Self> {
        let category = category.to_lowercase();
        let has = |needle: &str| category.contains(needle);
        if has("sql") || has("injection") {
            Some(Self::SqlInjection)
        } else if has("xss") || has("scripting") {
            Some(Self::Xss)
        } else if has("auth") || has("jwt") || has("access") || has("misconfig") {
            Some(Self::Auth)
        } else if has("path") || has("traversal") || has("xxe") {
            Some(Self::PathTraversal)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackVerdict {
    pub passed: bool,
    pub family: Option<Family>,
    pub message: String,
}

/// Run the simplified check for `category`.
pub fn check(category: &str, content: &str) -> FallbackVerdict {
    let family = Family::from_category(category);
    let has = |needle: &str| content.contains(needle);

    let (passed, detail) = match family {
        Some(Family::SqlInjection) => {
            let placeholder = has("?") || has("$1") || has(":id");
            let concatenation = ["' +", "\" +", "+ '", "+ \"", "${"]
                .iter()
                .any(|c| has(c));
            (
                placeholder && !concatenation,
                "expects a parameter placeholder and no string concatenation",
            )
        }
        Some(Family::Xss) => {
            let unsafe_sink = has("innerHTML") || has("document.write");
            let safe_sink = has("textContent") || has("innerText") || has("DOMPurify");
            (
                safe_sink && !unsafe_sink,
                "expects textContent/innerText or DOMPurify and no innerHTML",
            )
        }
        Some(Family::Auth) => (
            has("process.env") && !has("Math.random"),
            "expects secrets from process.env and no Math.random tokens",
        ),
        Some(Family::PathTraversal) => (
            (has("path.resolve") || has("path.normalize")) && has("startsWith"),
            "expects path.resolve/normalize with a startsWith containment check",
        ),
        None => (false, "no simplified check exists for this category"),
    };

    let status = if passed { "looks fixed" } else { "not verified" };
    FallbackVerdict {
        passed,
        family,
        message: format!(
            "Validation could only be partially performed; basic check {status} ({detail})"
        ),
    }
}
