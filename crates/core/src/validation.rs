use std::{collections::BTreeMap, fmt};

use serde::Serialize;

/// Upper bound for free-text fields such as emails and domain names.
pub const MAX_TEXT_LEN: usize = 128;

const BLANK: &str = "cannot be blank";

/// Request types that can check their own fields before any storage access.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Field-level violations collected from a single request.
///
/// Only the first violation per field is kept; every field is still
/// inspected so callers see all broken fields at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation unless the field already has one.
    pub fn add<S: Into<String>>(&mut self, field: &'static str, reason: S) {
        self.fields.entry(field).or_insert_with(|| reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns the recorded reason for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Converts the collector into `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Requires a non-blank value (after trimming) of at most `max` characters.
    pub fn check_text(&mut self, field: &'static str, value: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, BLANK);
            return;
        }
        if trimmed.chars().count() > max {
            self.add(field, format!("the length must be no more than {max}"));
        }
    }

    /// Requires a non-blank identifier; numeric identifiers must not be negative.
    pub fn check_reference(&mut self, field: &'static str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, BLANK);
            return;
        }
        if let Ok(number) = trimmed.parse::<f64>() {
            if number < 0.0 {
                self.add(field, "must be no less than 0");
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, reason) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {reason}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_whitespace_are_rejected() {
        let mut errors = ValidationErrors::new();
        errors.check_text("email", "", MAX_TEXT_LEN);
        errors.check_text("name", "   ", MAX_TEXT_LEN);
        assert_eq!(errors.get("email"), Some("cannot be blank"));
        assert_eq!(errors.get("name"), Some("cannot be blank"));
    }

    #[test]
    fn length_is_measured_after_trim() {
        let mut errors = ValidationErrors::new();
        let padded = format!("  {}  ", "a".repeat(MAX_TEXT_LEN));
        errors.check_text("name", &padded, MAX_TEXT_LEN);
        assert!(errors.is_empty());

        errors.check_text("name", &"a".repeat(MAX_TEXT_LEN + 1), MAX_TEXT_LEN);
        assert_eq!(
            errors.get("name"),
            Some("the length must be no more than 128")
        );
    }

    #[test]
    fn first_violation_per_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("first"));
    }

    #[test]
    fn references_reject_negative_numbers_only() {
        let mut errors = ValidationErrors::new();
        errors.check_reference("account_id", "0");
        errors.check_reference("account_id", "8f14e45f-ceea-467f-a0e6-5d3b1a1e2c9f");
        assert!(errors.is_empty());

        errors.check_reference("account_id", "-1");
        assert_eq!(errors.get("account_id"), Some("must be no less than 0"));

        let mut errors = ValidationErrors::new();
        errors.check_reference("account_id", "-0.5");
        assert_eq!(errors.get("account_id"), Some("must be no less than 0"));
    }

    #[test]
    fn display_lists_fields_in_order() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "cannot be blank");
        errors.add("account_id", "cannot be blank");
        assert_eq!(
            errors.to_string(),
            "account_id: cannot be blank; name: cannot be blank"
        );
        assert!(errors.into_result().is_err());
    }
}
