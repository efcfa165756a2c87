//! Shared validation utilities
//!
//! Common validation functions for input data across commands and queries.

use thiserror::Error;

/// Errors that can occur during name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be between 1 and {max_length} characters")]
    TooLong {
        field: &'static str,
        max_length: usize,
    },
}

/// Validate a required name-like field
///
/// # Rules
/// - Must not be empty (after trimming whitespace)
/// - Must not exceed max_length characters
pub fn validate_name(
    value: &str,
    field: &'static str,
    max_length: usize,
) -> Result<(), NameValidationError> {
    if value.trim().is_empty() {
        return Err(NameValidationError::Required { field });
    }

    if value.len() > max_length {
        return Err(NameValidationError::TooLong { field, max_length });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_name() {
        assert!(validate_name("Genomic", "template", 255).is_ok());
    }

    #[test]
    fn test_whitespace_only_rejected() {
        assert!(matches!(
            validate_name("   ", "template", 255),
            Err(NameValidationError::Required { field: "template" })
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        let long = "a".repeat(300);
        assert!(matches!(
            validate_name(&long, "project", 255),
            Err(NameValidationError::TooLong { .. })
        ));
    }
}
