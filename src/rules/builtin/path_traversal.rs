use super::{BuiltinRuleSet, PatternDef};

/// File paths joined from request input without a containment check.
pub const RULES: BuiltinRuleSet = BuiltinRuleSet {
    category: "path-traversal",
    display_name: "Path Traversal Prevention",
    recommendation: "Resolve the requested path against a fixed base directory and reject it \
                     unless the result still starts with that base.",
    vulnerable: &[
        PatternDef {
            id: "join-request-input",
            regex: r"\bpath\.join\([^()\n]*\breq\.(?:params|query|body)",
            description: "path.join with raw request input",
        },
        PatternDef {
            id: "fs-request-input",
            regex: r"\bfs\.\w+\(\s*req\.(?:params|query|body)",
            description: "File system call on raw request input",
        },
        PatternDef {
            id: "concat-request-input",
            regex: r#"['"`][^'"`\n]*/['"`]\s*\+\s*req\.(?:params|query|body)"#,
            description: "Directory string concatenated with request input",
        },
        PatternDef {
            id: "send-file-request-input",
            regex: r"\bres\.(?:sendFile|download)\(\s*req\.(?:params|query|body)",
            description: "sendFile/download on raw request input",
        },
    ],
    secure: &[
        PatternDef {
            id: "path-resolve",
            regex: r"\bpath\.resolve\s*\(",
            description: "Path resolved to an absolute location",
        },
        PatternDef {
            id: "path-normalize",
            regex: r"\bpath\.normalize\s*\(",
            description: "Path normalized",
        },
        PatternDef {
            id: "containment-check",
            regex: r"\.startsWith\s*\(",
            description: "Resolved path checked against base directory",
        },
        PatternDef {
            id: "basename",
            regex: r"\bpath\.basename\s*\(",
            description: "Directory components stripped with basename",
        },
        PatternDef {
            id: "realpath",
            regex: r"\brealpath(?:Sync)?\s*\(",
            description: "Symlinks resolved with realpath",
        },
    ],
};
