use super::{BuiltinRuleSet, PatternDef};

/// Hardcoded secrets, unverified tokens and weak credential handling.
pub const RULES: BuiltinRuleSet = BuiltinRuleSet {
    category: "auth",
    display_name: "Authentication Security",
    recommendation: "Load secrets from the environment, verify tokens with jwt.verify, hash \
                     passwords with bcrypt and generate tokens with crypto.randomBytes.",
    vulnerable: &[
        PatternDef {
            id: "hardcoded-secret",
            regex: r#"(?i)\b\w*(?:secret|password|passwd|api_?key|token)\w*\s*[:=]\s*['"][^'"\n]{1,16}['"]"#,
            description: "Short secret hardcoded in source",
        },
        PatternDef {
            id: "literal-signing-key",
            regex: r#"\bjwt\.(?:sign|verify)\([^,\n]+,\s*['"][^'"\n]*['"]"#,
            description: "JWT signed or verified with a literal key",
        },
        PatternDef {
            id: "alg-none",
            regex: r#"(?i)\balgorithms?\s*:\s*\[?\s*['"]none['"]"#,
            description: "JWT 'none' algorithm accepted",
        },
        PatternDef {
            id: "decode-without-verify",
            regex: r"\bjwt\.decode\s*\(",
            description: "JWT decoded without signature verification",
        },
        PatternDef {
            id: "plaintext-password-compare",
            regex: r"(?i)\bpassword\w*\s*[!=]==?\s*[\w.]",
            description: "Password compared in plaintext",
        },
        PatternDef {
            id: "insecure-random-token",
            regex: r"\bMath\.random\s*\(",
            description: "Token generated with Math.random",
        },
    ],
    secure: &[
        PatternDef {
            id: "env-secret",
            regex: r"\bprocess\.env\.[A-Z_][A-Z0-9_]*",
            description: "Secret loaded from the environment",
        },
        PatternDef {
            id: "password-hash",
            regex: r"\b(?:bcrypt|argon2|scrypt)\.(?:compare|hash|verify)\w*\s*\(",
            description: "Password hashing library",
        },
        PatternDef {
            id: "jwt-verify",
            regex: r"\bjwt\.verify\s*\(",
            description: "JWT signature verification",
        },
        PatternDef {
            id: "crypto-random",
            regex: r"\bcrypto\.(?:randomBytes|randomUUID|getRandomValues)\s*\(",
            description: "Cryptographically secure randomness",
        },
        PatternDef {
            id: "timing-safe-compare",
            regex: r"\bcrypto\.timingSafeEqual\s*\(",
            description: "Constant-time comparison",
        },
    ],
};
