//! User-visible notifications.
//!
//! Every failure path that reaches a handler ends in either inline
//! [`FieldErrors`](super::FieldErrors) or a [`Notice`]; nothing is only
//! logged.

use serde::{Deserialize, Serialize};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message shown at the top of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// A success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// An error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Whether this notice reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert!(Notice::error("Invalid event code").is_error());
        assert!(!Notice::success("Coupon created successfully!").is_error());
    }

    #[test]
    fn test_serializes_for_flash_storage() {
        let notice = Notice::success("Coupon deleted successfully!");
        let json = serde_json::to_string(&notice).unwrap();
        assert_eq!(
            json,
            r#"{"level":"success","message":"Coupon deleted successfully!"}"#
        );
        let back: Notice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, notice);
    }
}
