//! Event redemption code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`RedemptionCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RedemptionCodeError {
    /// The input is empty after trimming.
    #[error("event code is required")]
    Empty,
    /// The input is too long.
    #[error("event code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A redemption (event) code entered at the gate.
///
/// Only non-emptiness is checked locally; whether the code unlocks an
/// event is decided by the backend.
///
/// ```
/// use eventconnect_core::RedemptionCode;
///
/// assert_eq!(RedemptionCode::parse(" EVT-42 ").unwrap().as_str(), "EVT-42");
/// assert!(RedemptionCode::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RedemptionCode(String);

impl RedemptionCode {
    /// Upper bound on accepted input, well above any real event code.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `RedemptionCode`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or too long.
    pub fn parse(s: &str) -> Result<Self, RedemptionCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RedemptionCodeError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(RedemptionCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name offered for the generated business-card document.
    #[must_use]
    pub fn pdf_file_name(&self) -> String {
        let safe: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("business-card-{safe}.pdf")
    }
}

impl fmt::Display for RedemptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RedemptionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let code = RedemptionCode::parse("  SUMMIT24\n").unwrap();
        assert_eq!(code.as_str(), "SUMMIT24");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(RedemptionCode::parse(""), Err(RedemptionCodeError::Empty));
        assert_eq!(RedemptionCode::parse(" \t"), Err(RedemptionCodeError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "x".repeat(RedemptionCode::MAX_LENGTH + 1);
        assert!(matches!(
            RedemptionCode::parse(&long),
            Err(RedemptionCodeError::TooLong { .. })
        ));
    }

    #[test]
    fn test_pdf_file_name_sanitises() {
        let code = RedemptionCode::parse("EVT 2024/01").unwrap();
        assert_eq!(code.pdf_file_name(), "business-card-EVT_2024_01.pdf");
    }
}
