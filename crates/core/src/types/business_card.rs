//! Business card drafts, submissions, and stored records.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{BusinessCardId, Email, FieldErrors, RedemptionCode};

/// Backend message confirming a saved card.
pub const CARD_SAVED: &str = "Business card saved successfully";
pub const SAVE_FAILED: &str = "Failed to save business card";
pub const DOWNLOAD_FAILED: &str = "Failed to download PDF";
pub const DOWNLOAD_STARTED: &str = "Your business card has been downloaded successfully";
pub const FETCH_CARDS_FAILED: &str = "Failed to fetch business cards";

/// A professional certification listed on a card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub year: String,
}

impl Certification {
    /// Build a certification from one form row.
    ///
    /// Returns `None` when all three cells are blank so empty rows in the
    /// form do not become empty certifications.
    #[must_use]
    pub fn from_row(name: &str, issuer: &str, year: &str) -> Option<Self> {
        let (name, issuer, year) = (name.trim(), issuer.trim(), year.trim());
        if name.is_empty() && issuer.is_empty() && year.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            issuer: issuer.to_owned(),
            year: year.to_owned(),
        })
    }
}

/// The visitor-editable part of a business card.
///
/// Field names serialize in camelCase to match the backend contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCardDraft {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub full_name: String,

    #[validate(length(min = 2, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 10, message = "Invalid phone number"))]
    pub phone: String,

    #[validate(length(min = 2, message = "Company name is required"))]
    pub company_name: String,

    #[validate(url(message = "Invalid URL"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[validate(length(min = 5, message = "Address is required"))]
    pub address: String,

    #[serde(default)]
    pub certifications: Vec<Certification>,
}

impl BusinessCardDraft {
    /// Trim every text field and treat a blank website as absent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.full_name = self.full_name.trim().to_owned();
        self.title = self.title.trim().to_owned();
        self.phone = self.phone.trim().to_owned();
        self.company_name = self.company_name.trim().to_owned();
        self.address = self.address.trim().to_owned();
        self.website = self
            .website
            .map(|w| w.trim().to_owned())
            .filter(|w| !w.is_empty());
        self
    }

    /// Normalize and validate the draft.
    ///
    /// # Errors
    ///
    /// Returns per-field messages keyed by the camelCase field name.
    pub fn validated(self) -> Result<Self, FieldErrors> {
        let draft = self.normalized();
        match draft.validate() {
            Ok(()) => Ok(draft),
            Err(errors) => Err(camel_case_keys(&FieldErrors::from(errors))),
        }
    }

    /// Attach the verified identity to produce the backend payload.
    #[must_use]
    pub const fn into_submission(
        self,
        email: Email,
        redeem_code: RedemptionCode,
    ) -> BusinessCardSubmission {
        BusinessCardSubmission {
            card: self,
            email,
            redeem_code,
        }
    }
}

/// `validator` reports Rust field names; forms and templates use the wire
/// (camelCase) names.
fn camel_case_keys(errors: &FieldErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, message) in errors.iter() {
        let key = match field {
            "full_name" => "fullName",
            "company_name" => "companyName",
            other => other,
        };
        out.insert(key, message);
    }
    out
}

/// The full body of `POST /api/business-cards`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCardSubmission {
    #[serde(flatten)]
    pub card: BusinessCardDraft,
    pub email: Email,
    pub redeem_code: RedemptionCode,
}

/// A stored business card, as returned by the card listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCard {
    #[serde(rename = "_id")]
    pub id: BusinessCardId,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub redeem_code: String,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

impl BusinessCard {
    /// Name and title as shown in the listing's first column.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.full_name, self.title).trim().to_owned()
    }
}
