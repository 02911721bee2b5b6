//! Per-field validation for wizard forms.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Loose e-mail shape check; the contract service does the real verification.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$";

/// International or Swiss/German/Austrian national phone numbers.
const PHONE_PATTERN: &str = r"^(\+|00)?[0-9][0-9 ()/-]{6,18}[0-9]$";

/// Four- or five-digit postal codes.
const POSTAL_CODE_PATTERN: &str = r"^[0-9]{4,5}$";

/// Field name to message, in the order fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, String>);

impl FieldErrors {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error; the first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Records `message` when `value` is blank.
    pub fn require(&mut self, field: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.add(field, message);
        }
    }

    /// Returns `true` if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Iterates `(field, message)` pairs in check order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Converts into `Ok(())` when empty.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cached(cell, pattern).is_some_and(|re| re.is_match(value.trim()))
}

/// Returns `true` if `value` looks like an e-mail address.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, EMAIL_PATTERN, value)
}

/// Returns `true` if `value` looks like a phone number.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, PHONE_PATTERN, value)
}

/// Returns `true` if `value` is a 4- or 5-digit postal code.
#[must_use]
pub fn is_valid_postal_code(value: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, POSTAL_CODE_PATTERN, value)
}
