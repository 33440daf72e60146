//! One-time verification code entered by the visitor.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A verification code as typed into the code field.
///
/// The field is capped at [`OtpCode::MAX_LENGTH`] characters; longer input
/// is truncated rather than rejected, the same way a `maxlength` input
/// behaves. No other format rule is applied.
///
/// ```
/// use eventconnect_core::OtpCode;
///
/// assert_eq!(OtpCode::from_input("1234567890").as_str(), "123456");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Maximum number of characters kept from the input.
    pub const MAX_LENGTH: usize = 6;

    /// Build a code from raw input, keeping at most six characters.
    #[must_use]
    pub fn from_input(input: &str) -> Self {
        Self(input.trim().chars().take(Self::MAX_LENGTH).collect())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether nothing was entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
