//! Product size labels.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Size`] from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    /// No size was selected.
    #[error("select a product size")]
    Missing,
}

/// A size label such as `"M"` or `"XL"`.
///
/// Sizes coming from the backend (product size lists, cart snapshots) are
/// taken as-is. Sizes chosen by a shopper go through [`Size::parse`], which
/// rejects an absent or blank selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(String);

impl Size {
    /// Parse a shopper-selected size.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`SizeError::Missing`] when the input is absent or blank.
    pub fn parse(input: Option<&str>) -> Result<Self, SizeError> {
        match input.map(str::trim) {
            Some(label) if !label.is_empty() => Ok(Self(label.to_owned())),
            _ => Err(SizeError::Missing),
        }
    }

    /// Returns the size label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::borrow::Borrow<str> for Size {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Size {
    fn from(label: &str) -> Self {
        Self(label.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_size() {
        assert_eq!(Size::parse(Some("M")).unwrap().as_str(), "M");
        assert_eq!(Size::parse(Some("  XL ")).unwrap().as_str(), "XL");
    }

    #[test]
    fn test_parse_missing_size() {
        assert_eq!(Size::parse(None), Err(SizeError::Missing));
        assert_eq!(Size::parse(Some("")), Err(SizeError::Missing));
        assert_eq!(Size::parse(Some("   ")), Err(SizeError::Missing));
    }

    #[test]
    fn test_backend_sizes_are_not_validated() {
        let size: Size = serde_json::from_str("\"\"").unwrap();
        assert_eq!(size.as_str(), "");
    }
}
