//! Validation of the free-text booking reason.

use crate::error::CoreError;

/// Validate a motif, returning the trimmed text.
///
/// Empty or whitespace-only input is rejected. There is no length cap;
/// the backend enforces its own limits.
pub fn validate_motif(input: &str) -> Result<String, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Veuillez indiquer le motif du rendez-vous".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
