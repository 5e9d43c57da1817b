//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Validates that a question contains something besides whitespace.
pub fn validate_question(question: &str) -> Result<(), ValidationError> {
    if question.trim().is_empty() {
        let mut err = ValidationError::new("question_blank");
        err.message = Some("Question must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that every option is non-blank and that no option is repeated.
///
/// Options are compared after trimming, so `"A"` and `" A "` collide.
///
/// # Examples
///
/// ```ignore
/// validate_options(&["A".into(), "B".into()]) // Ok
/// validate_options(&["A".into(), " ".into()]) // Err - blank
/// validate_options(&["A".into(), "A".into()]) // Err - duplicate
/// ```
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        let option = option.trim();
        if option.is_empty() {
            let mut err = ValidationError::new("option_blank");
            err.message = Some("Options must not be blank".into());
            return Err(err);
        }
        if !seen.insert(option) {
            let mut err = ValidationError::new("option_duplicate");
            err.message = Some(format!("Option `{option}` is listed more than once").into());
            return Err(err);
        }
    }
    Ok(())
}

/// Validates that every option flagged as correct is one of the poll's options.
pub fn validate_correct_options(
    options: &[String],
    correct_options: &[String],
) -> Result<(), ValidationError> {
    let known: HashSet<&str> = options.iter().map(|option| option.trim()).collect();
    if let Some(unknown) = correct_options
        .iter()
        .map(|option| option.trim())
        .find(|option| !known.contains(option))
    {
        let mut err = ValidationError::new("correct_option_unknown");
        err.message = Some(format!("Correct option `{unknown}` is not one of the options").into());
        return Err(err);
    }
    Ok(())
}
