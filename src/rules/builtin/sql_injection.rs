use super::{BuiltinRuleSet, PatternDef};

/// Queries assembled from untrusted strings instead of bound parameters.
pub const RULES: BuiltinRuleSet = BuiltinRuleSet {
    category: "sql-injection",
    display_name: "SQL Injection Prevention",
    recommendation: "Use parameterized queries (e.g. db.query(sql, [value])) or prepared statements \
                     instead of building SQL from strings.",
    vulnerable: &[
        PatternDef {
            id: "string-concatenation",
            regex: r#"(?i)\b(?:select|insert|update|delete)\b[^;\n]*?['"`]\s*\+\s*[A-Za-z_$]"#,
            description: "SQL statement built by string concatenation",
        },
        PatternDef {
            id: "template-interpolation",
            regex: r"(?i)\b(?:select|insert|update|delete)\b[^`;\n]*\$\{",
            description: "SQL statement built with template-literal interpolation",
        },
        PatternDef {
            id: "query-append",
            regex: r#"(?i)\b(?:query|sql)\w*\s*\+=\s*(?:[A-Za-z_$]|[^;\n]*?['"`]\s*\+\s*[A-Za-z_$])"#,
            description: "Query string extended with a variable",
        },
        PatternDef {
            id: "raw-request-input",
            regex: r"\.(?:query|execute|raw)\(\s*req\.(?:body|query|params)",
            description: "Request input passed directly as SQL text",
        },
    ],
    secure: &[
        PatternDef {
            id: "parameter-array",
            regex: r"\.(?:query|execute|run|all|get)\(\s*[^,()\n]+,\s*\[",
            description: "Query executed with a bound parameter array",
        },
        PatternDef {
            id: "named-parameters",
            regex: r"\.(?:query|execute)\(\s*[^,()\n]+,\s*\{",
            description: "Query executed with named parameters",
        },
        PatternDef {
            id: "prepared-statement",
            regex: r"\.prepare\s*\(",
            description: "Prepared statement",
        },
        PatternDef {
            id: "driver-escape",
            regex: r"\b(?:mysql|connection|conn|db|pool)\.escape\s*\(",
            description: "Driver-provided escaping",
        },
    ],
};
