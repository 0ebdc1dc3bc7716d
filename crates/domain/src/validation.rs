//! Field validation for incoming requests.

use serde::Serialize;

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field, as it appears in requests.
    pub field: &'static str,
    /// Human-readable constraint message.
    pub message: String,
}

/// All constraint violations found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error list holding one violation.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a violation.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Returns true if `field` has at least one violation.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Converts into `Err(self)` if any violation was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Checks that `value` has between `min` and `max` characters.
    pub fn check_length(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            if min == 0 {
                self.add(field, format!("{field} cannot exceed {max} characters"));
            } else {
                self.add(
                    field,
                    format!("{field} must be between {min} and {max} characters"),
                );
            }
        }
    }

    /// Checks that `value` is non-blank and within the given length.
    pub fn check_required_text(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        if value.trim().is_empty() {
            self.add(field, format!("{field} is required"));
        } else {
            self.check_length(field, value, min, max);
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
