/// Validation for names that end up as session keys or header values

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Input too long: max {max} characters, got {actual}")]
    InputTooLong { max: usize, actual: usize },

    #[error("Invalid characters detected")]
    InvalidCharacters,

    #[error("Empty input not allowed")]
    EmptyInput,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Validate an identifier used to build a session key
pub fn validate_input(input: &str, max_length: usize) -> Result<(), ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    validate_optional_input(input, max_length)
}

/// Same as `validate_input`, but an empty string is accepted
pub fn validate_optional_input(input: &str, max_length: usize) -> Result<(), ValidationError> {
    if input.chars().count() > max_length {
        return Err(ValidationError::InputTooLong {
            max: max_length,
            actual: input.chars().count(),
        });
    }

    // Null bytes and control characters never belong in a key
    if input.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters);
    }

    Ok(())
}

/// A token name prefix must not contain the `:` separator
pub fn validate_token_prefix(prefix: &str, max_length: usize) -> Result<(), ValidationError> {
    validate_input(prefix, max_length)?;

    if prefix.contains(':') {
        return Err(ValidationError::InvalidFormat(
            format!("Token name prefix must not contain ':': {}", prefix)
        ));
    }

    Ok(())
}

/// Header names are restricted to visible ASCII without separators
pub fn validate_header_name(name: &str) -> Result<(), ValidationError> {
    validate_input(name, 128)?;

    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
        return Err(ValidationError::InvalidFormat(
            format!("Not a valid header name: {}", name)
        ));
    }

    Ok(())
}
