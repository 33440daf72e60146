//! Business card capture route handlers.
//!
//! A card can only be saved for a verified flow. The email and redemption
//! code come from the flow, never from the form. The flow is claimed before
//! the backend call, so one pass saves at most one card. A successful save
//! closes the flow, so its pass stops working, and parks the generated PDF
//! for a single download from the confirmation page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use eventconnect_core::types::business_card::{
    CARD_SAVED, DOWNLOAD_FAILED, DOWNLOAD_STARTED, SAVE_FAILED,
};
use eventconnect_core::{BusinessCardDraft, Certification, FieldErrors, Notice, VerificationSession};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::verify::{page, resolve_flow};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::services::PdfDownload;
use crate::state::AppState;

/// Blank certification rows offered on an empty form.
const BLANK_CERTIFICATION_ROWS: usize = 2;

/// Business card form data.
///
/// Certifications arrive as parallel repeated fields, one value per row.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardForm {
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub cert_name: Vec<String>,
    #[serde(default)]
    pub cert_issuer: Vec<String>,
    #[serde(default)]
    pub cert_year: Vec<String>,
}

impl CardForm {
    /// The draft described by the form. Blank certification rows are dropped.
    #[must_use]
    pub fn draft(&self) -> BusinessCardDraft {
        let rows = self
            .cert_name
            .len()
            .max(self.cert_issuer.len())
            .max(self.cert_year.len());
        let certifications = (0..rows)
            .filter_map(|i| {
                Certification::from_row(
                    cell(&self.cert_name, i),
                    cell(&self.cert_issuer, i),
                    cell(&self.cert_year, i),
                )
            })
            .collect();

        BusinessCardDraft {
            full_name: self.full_name.clone(),
            title: self.title.clone(),
            phone: self.phone.clone(),
            company_name: self.company_name.clone(),
            website: Some(self.website.clone()),
            address: self.address.clone(),
            certifications,
        }
    }
}

fn cell(values: &[String], index: usize) -> &str {
    values.get(index).map_or("", String::as_str)
}

/// Values and errors of the business card modal.
#[derive(Debug, Clone, Default)]
pub struct CardFormView {
    pub full_name: String,
    pub title: String,
    pub phone: String,
    pub company_name: String,
    pub website: String,
    pub address: String,
    pub certifications: Vec<Certification>,
    pub errors: FieldErrors,
}

impl CardFormView {
    /// An empty form.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            certifications: vec![Certification::default(); BLANK_CERTIFICATION_ROWS],
            ..Self::default()
        }
    }

    /// Re-render a submitted draft, keeping one blank row for another entry.
    #[must_use]
    pub fn from_draft(draft: &BusinessCardDraft, errors: FieldErrors) -> Self {
        let mut certifications = draft.certifications.clone();
        certifications.push(Certification::default());
        Self {
            full_name: draft.full_name.clone(),
            title: draft.title.clone(),
            phone: draft.phone.clone(),
            company_name: draft.company_name.clone(),
            website: draft.website.clone().unwrap_or_default(),
            address: draft.address.clone(),
            certifications,
            errors,
        }
    }
}

/// Confirmation page shown after a successful save.
///
/// Refreshes back to the gate after two seconds.
#[derive(Template, WebTemplate)]
#[template(path = "card/saved.html")]
pub struct SavedTemplate {
    pub notices: Vec<Notice>,
    pub download_url: Option<String>,
    pub file_name: String,
}

/// Save the business card, then fetch and park its PDF.
#[instrument(skip(state, form))]
pub async fn save(State(state): State<AppState>, Form(form): Form<CardForm>) -> Response {
    let (pass, session) = match resolve_flow(&state, &form.pass).await {
        Ok(flow) => flow,
        Err(redirect) => return redirect.into_response(),
    };

    if let Err(e) = session.with(|s| s.verified_identity()) {
        tracing::info!(error = %e, "Card submitted before verification");
        return page(&form.pass, &session).into_response();
    }

    let submitted = form.draft();
    let draft = match submitted.clone().validated() {
        Ok(draft) => draft,
        Err(errors) => {
            return page(&form.pass, &session)
                .with_card(CardFormView::from_draft(&submitted, errors))
                .into_response();
        }
    };

    let (ticket, email, redeem_code) = match session.with(VerificationSession::begin_submission) {
        Ok(claim) => claim,
        Err(e) => {
            tracing::info!(error = %e, "Card already being saved for this flow");
            return page(&form.pass, &session).into_response();
        }
    };

    let submission = draft.clone().into_submission(email, redeem_code.clone());
    let pdf_url = match state.backend().save_business_card(&submission).await {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(code = %redeem_code, error = %e, "Failed to save business card");
            if let Err(e) = session.with(|s| s.submission_failed(ticket)) {
                tracing::debug!(error = %e, "Stale save failure ignored");
            }
            return page(&form.pass, &session)
                .with_notice(Some(Notice::error(SAVE_FAILED)))
                .with_card(CardFormView::from_draft(&draft, FieldErrors::new()))
                .into_response();
        }
    };

    state.flows().close(&pass.flow_id).await;
    tracing::info!(code = %redeem_code, "Business card saved");
    add_breadcrumb(
        "business_card",
        "Business card saved",
        Some(&[("redeem_code", redeem_code.as_str())]),
    );

    let file_name = redeem_code.pdf_file_name();
    let mut notices = vec![Notice::success(CARD_SAVED)];
    let download_url = match state.backend().download_pdf(&pdf_url).await {
        Ok(bytes) => {
            let ticket = state
                .pdfs()
                .put(PdfDownload {
                    file_name: file_name.clone(),
                    bytes,
                })
                .await;
            notices.push(Notice::success(DOWNLOAD_STARTED));
            Some(format!("/card/pdf/{}", ticket.simple()))
        }
        Err(e) => {
            tracing::error!(url = %pdf_url, error = %e, "Failed to download business card PDF");
            notices.push(Notice::error(DOWNLOAD_FAILED));
            None
        }
    };

    SavedTemplate {
        notices,
        download_url,
        file_name,
    }
    .into_response()
}

/// One-shot PDF download.
#[instrument(skip(state))]
pub async fn download(State(state): State<AppState>, Path(ticket): Path<Uuid>) -> Result<Response> {
    let pdf = state
        .pdfs()
        .take(&ticket)
        .await
        .ok_or_else(|| AppError::NotFound("business card PDF".to_string()))?;

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", pdf.file_name),
            ),
        ],
        pdf.bytes.clone(),
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CardForm {
        CardForm {
            pass: "p".to_string(),
            full_name: " Ada Lovelace ".to_string(),
            title: "Engineer".to_string(),
            phone: "1234567890".to_string(),
            company_name: "Analytical Co".to_string(),
            website: String::new(),
            address: "12 Engine Row".to_string(),
            cert_name: vec!["PMP".to_string(), String::new()],
            cert_issuer: vec!["PMI".to_string(), String::new()],
            cert_year: vec!["2020".to_string()],
        }
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let draft = form().draft();
        assert_eq!(draft.certifications.len(), 1);
        assert_eq!(draft.certifications[0].issuer, "PMI");
    }

    #[test]
    fn test_form_draft_validates() {
        let draft = form().draft().validated().unwrap();
        assert_eq!(draft.full_name, "Ada Lovelace");
        assert_eq!(draft.website, None);
    }

    #[test]
    fn test_short_phone_is_reported_on_the_form() {
        let mut form = form();
        form.phone = "12345".to_string();
        let errors = form.draft().validated().unwrap_err();
        let view = CardFormView::from_draft(&form.draft(), errors);
        assert!(view.errors.has("phone"));
        assert_eq!(view.phone, "12345");
        assert_eq!(view.certifications.len(), 2);
    }

    #[test]
    fn test_saved_page_refreshes_to_gate() {
        let html = SavedTemplate {
            notices: vec![Notice::success(CARD_SAVED)],
            download_url: Some("/card/pdf/abc".to_string()),
            file_name: "business-card-SUMMIT24.pdf".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("content=\"2;url=/\""));
        assert!(html.contains("/card/pdf/abc"));
    }
}
