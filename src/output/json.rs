use crate::error::Result;
use crate::validator::ValidationResult;

/// Render a validation result as pretty-printed JSON.
pub fn render(result: &ValidationResult) -> Result<String> {
    let json = serde_json::to_string_pretty(result)?;
    Ok(json)
}
