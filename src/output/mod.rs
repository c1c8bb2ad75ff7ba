pub mod console;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::challenge::CheckOutcome;
use crate::error::Result;
use crate::fallback::FallbackVerdict;
use crate::validator::ValidationResult;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render a validation result into the specified format.
pub fn render(result: &ValidationResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(result)),
        OutputFormat::Json => json::render(result),
    }
}

/// Render a fallback verdict into the specified format.
pub fn render_degraded(verdict: &FallbackVerdict, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render_degraded(verdict)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(verdict)?),
    }
}

/// Render whichever outcome a solution check produced.
pub fn render_outcome(outcome: &CheckOutcome, format: OutputFormat) -> Result<String> {
    match outcome {
        CheckOutcome::Full { result, .. } => render(result, format),
        CheckOutcome::Degraded { verdict } => render_degraded(verdict, format),
    }
}
