//! Coupon records and the coupon creation form.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{CouponId, FieldErrors};

pub const COUPON_CREATED: &str = "Coupon created successfully!";
pub const CREATE_FAILED: &str = "Failed to create coupon";
pub const COUPON_PUBLISHED: &str = "Coupon published successfully!";
pub const COUPON_UNPUBLISHED: &str = "Coupon unpublished successfully!";
pub const STATUS_FAILED: &str = "Failed to update coupon status";
pub const COUPON_DELETED: &str = "Coupon deleted successfully!";
pub const DELETE_FAILED: &str = "Failed to delete coupon";
pub const FETCH_COUPONS_FAILED: &str = "Failed to fetch coupons";

/// A coupon as returned by the admin coupon listing.
///
/// Dates are kept as the backend sent them and formatted on display, so a
/// record with an unexpected date shape still renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: CouponId,
    pub code: String,
    #[serde(default)]
    pub valid_from: String,
    #[serde(default)]
    pub valid_to: String,
    #[serde(default)]
    pub is_published: bool,
}

impl Coupon {
    /// `validFrom` formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn valid_from_display(&self) -> String {
        display_date(&self.valid_from)
    }

    /// `validTo` formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn valid_to_display(&self) -> String {
        display_date(&self.valid_to)
    }

    /// "Published" or "Unpublished".
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        if self.is_published {
            "Published"
        } else {
            "Unpublished"
        }
    }
}

/// Format a backend timestamp (RFC 3339 or plain date) as a calendar date.
fn display_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.to_string();
    }
    raw.to_owned()
}

/// Raw coupon creation form input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub valid_from: String,
    #[serde(default)]
    pub valid_to: String,
}

/// A validated coupon ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub code: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

impl CouponForm {
    /// Validate the form.
    ///
    /// The code must be non-empty, both dates must be present and valid,
    /// and `valid_to` must not be earlier than `valid_from` (equal dates are
    /// a one-day coupon).
    ///
    /// # Errors
    ///
    /// Returns per-field messages when any rule fails.
    pub fn validate(&self) -> Result<NewCoupon, FieldErrors> {
        let mut errors = FieldErrors::new();

        let code = self.code.trim();
        if code.is_empty() {
            errors.insert("code", "Coupon code is required");
        }

        let valid_from = parse_date(&self.valid_from, "validFrom", "Valid from", &mut errors);
        let valid_to = parse_date(&self.valid_to, "validTo", "Valid to", &mut errors);

        if let (Some(from), Some(to)) = (valid_from, valid_to)
            && to < from
        {
            errors.insert(
                "validTo",
                "Valid to date cannot be earlier than valid from date",
            );
        }

        match (valid_from, valid_to) {
            (Some(valid_from), Some(valid_to)) if errors.is_empty() => Ok(NewCoupon {
                code: code.to_owned(),
                valid_from,
                valid_to,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_date(
    raw: &str,
    field: &str,
    label: &str,
    errors: &mut FieldErrors,
) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.insert(field, format!("{label} date is required"));
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.insert(field, format!("{label} date must be a valid date"));
            None
        }
    }
}

/// Body of the publish toggle request.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishChange {
    pub is_published: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(code: &str, from: &str, to: &str) -> CouponForm {
        CouponForm {
            code: code.to_string(),
            valid_from: from.to_string(),
            valid_to: to.to_string(),
        }
    }

    #[test]
    fn test_valid_range() {
        let coupon = form("SUMMIT", "2025-03-01", "2025-03-31").validate().unwrap();
        assert_eq!(coupon.code, "SUMMIT");
        assert!(coupon.valid_to > coupon.valid_from);
    }

    #[test]
    fn test_equal_dates_accepted() {
        assert!(form("ONEDAY", "2025-03-01", "2025-03-01").validate().is_ok());
    }

    #[test]
    fn test_to_before_from_rejected() {
        let errors = form("BACKWARDS", "2025-03-02", "2025-03-01")
            .validate()
            .unwrap_err();
        assert_eq!(
            errors.get("validTo"),
            Some("Valid to date cannot be earlier than valid from date")
        );
        assert!(!errors.has("code"));
    }

    #[test]
    fn test_required_fields() {
        let errors = form("  ", "", "").validate().unwrap_err();
        assert_eq!(errors.get("code"), Some("Coupon code is required"));
        assert_eq!(errors.get("validFrom"), Some("Valid from date is required"));
        assert_eq!(errors.get("validTo"), Some("Valid to date is required"));
    }

    #[test]
    fn test_malformed_date() {
        let errors = form("X", "03/01/2025", "2025-03-01").validate().unwrap_err();
        assert!(errors.has("validFrom"));
    }

    #[test]
    fn test_new_coupon_wire_format() {
        let coupon = form("SUMMIT", "2025-03-01", "2025-03-31").validate().unwrap();
        let json = serde_json::to_value(&coupon).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "SUMMIT",
                "validFrom": "2025-03-01",
                "validTo": "2025-03-31"
            })
        );
    }

    #[test]
    fn test_coupon_from_backend() {
        let coupon: Coupon = serde_json::from_value(serde_json::json!({
            "_id": "65a1",
            "code": "SUMMIT",
            "validFrom": "2025-03-01T00:00:00.000Z",
            "validTo": "2025-03-31T00:00:00.000Z",
            "isPublished": true,
            "__v": 0
        }))
        .unwrap();
        assert_eq!(coupon.id.as_str(), "65a1");
        assert_eq!(coupon.valid_from_display(), "2025-03-01");
        assert_eq!(coupon.valid_to_display(), "2025-03-31");
        assert_eq!(coupon.status_label(), "Published");
    }
}
