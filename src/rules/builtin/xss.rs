use super::{BuiltinRuleSet, PatternDef};

/// Untrusted data written into markup without escaping.
pub const RULES: BuiltinRuleSet = BuiltinRuleSet {
    category: "xss",
    display_name: "XSS Prevention",
    recommendation: "Insert untrusted data with textContent/createTextNode, or sanitize it \
                     (DOMPurify.sanitize, an HTML escaper) before rendering.",
    vulnerable: &[
        PatternDef {
            id: "inner-html-assignment",
            regex: r"\.innerHTML\s*\+?=\s*[^=\s]",
            description: "Markup assigned through innerHTML",
        },
        PatternDef {
            id: "outer-html-assignment",
            regex: r"\.outerHTML\s*\+?=\s*[^=\s]",
            description: "Markup assigned through outerHTML",
        },
        PatternDef {
            id: "document-write",
            regex: r"\bdocument\.write(?:ln)?\s*\(",
            description: "document.write with dynamic content",
        },
        PatternDef {
            id: "insert-adjacent-html",
            regex: r"\.insertAdjacentHTML\s*\(",
            description: "Markup inserted through insertAdjacentHTML",
        },
        PatternDef {
            id: "dangerously-set-inner-html",
            regex: r"\bdangerouslySetInnerHTML\b",
            description: "React dangerouslySetInnerHTML",
        },
        PatternDef {
            id: "eval-call",
            regex: r"\beval\s*\(",
            description: "eval of dynamic content",
        },
        PatternDef {
            id: "reflected-request-input",
            regex: r#"\bres\.(?:send|write)\(\s*(?:(?:['"][^'"\n]*['"]\s*\+\s*)?req\.(?:query|body|params)|`[^`]*\$\{\s*req\.(?:query|body|params))"#,
            description: "Request input reflected into the response body",
        },
    ],
    secure: &[
        PatternDef {
            id: "text-content",
            regex: r"\.textContent\s*=",
            description: "Text inserted with textContent",
        },
        PatternDef {
            id: "inner-text",
            regex: r"\.innerText\s*=",
            description: "Text inserted with innerText",
        },
        PatternDef {
            id: "create-text-node",
            regex: r"\bcreateTextNode\s*\(",
            description: "Text node creation",
        },
        PatternDef {
            id: "dompurify",
            regex: r"\bDOMPurify\.sanitize\s*\(",
            description: "DOMPurify sanitization",
        },
        PatternDef {
            id: "escape-helper",
            regex: r"\b(?:escapeHtml|escapeHTML|sanitizeHtml|encodeURIComponent)\s*\(",
            description: "HTML escaping helper",
        },
    ],
};
