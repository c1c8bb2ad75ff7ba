//! vulnfix: secure-coding trainer.
//!
//! Learners edit intentionally vulnerable snippets; vulnfix grades the fix.
//! A pattern stage looks for vulnerable and secure idioms per category, and
//! two optional external tools (eslint-plugin-security, `npm audit`) add
//! their own sub-scores. Missing tools degrade to partial credit.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use vulnfix::{challenge::Submission, config::Config, validate};
//!
//! let files = vec![PathBuf::from("./sqli-01/login.js")];
//! let submission = Submission::read("sqli-01", "sql-injection", files);
//! let result = validate(&submission, &Config::default()).unwrap();
//! println!("Score: {} ({}), passed: {}", result.score, result.grade, result.passed);
//! ```

pub mod analysis;
pub mod challenge;
pub mod config;
pub mod error;
pub mod fallback;
pub mod output;
pub mod rules;
pub mod tools;
pub mod validator;

use challenge::Submission;
use config::Config;
use error::Result;
use output::OutputFormat;

pub use validator::{ValidationResult, Validator};

/// Validate a submission with a validator built from `config`.
pub fn validate(submission: &Submission, config: &Config) -> Result<ValidationResult> {
    let validator = Validator::new(config)?;
    Ok(validator.validate(submission))
}

/// Render a validation result in the specified format.
pub fn render_report(result: &ValidationResult, format: OutputFormat) -> Result<String> {
    output::render(result, format)
}
