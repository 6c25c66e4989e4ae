//! Field-level form validation

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

/// Errors attached to form fields, plus an optional form-wide error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
    root: Option<String>,
}

impl ValidationErrors {
    /// Create an empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field. The first error recorded for a field wins.
    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record a form-wide error
    pub fn set_root(&mut self, message: &str) {
        self.root = Some(message.to_string());
    }

    /// Error for a single field
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Form-wide error
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Iterate over field errors in field-name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.root.is_none()
    }

    /// Ok when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        if let Some(root) = &self.root {
            parts.push(root.clone());
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Check an email address the way the sign-in form does
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Check that a value has at least `min` characters
pub fn has_min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// Check that a value is a UUID
pub fn is_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}
