//! Per-field validation errors rendered inline next to form inputs.

use std::collections::BTreeMap;

use serde::Serialize;
use validator::ValidationErrors;

/// Inline validation messages keyed by form field name.
///
/// Only the first message for each field is kept; that is the one a form
/// shows under the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field` unless one is already present.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    /// The message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether `field` has an error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Whether no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, list) in errors.field_errors() {
            let field = field.to_string();
            if let Some(first) = list.first() {
                let message = first
                    .message
                    .as_ref()
                    .map_or_else(|| format!("Invalid {field}"), ToString::to_string);
                out.insert(&field, message);
            }
        }
        out
    }
}
