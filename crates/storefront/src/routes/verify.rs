//! Email verification route handlers.
//!
//! Every request names its flow through the redemption pass. Handlers lock
//! the flow's session only to read or change it; backend calls happen with
//! the lock released, bracketed by a generation ticket so a stale completion
//! cannot overwrite newer state.

use std::time::Instant;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use eventconnect_core::flow::verification::{
    CODE_SENT, CODE_VERIFIED, INVALID_CODE, SEND_FAILED, VERIFY_UNAVAILABLE,
};
use eventconnect_core::{Email, FieldErrors, FlowError, Notice, OtpCode, Phase, VerificationSession};
use serde::Deserialize;
use tracing::instrument;

use super::card::CardFormView;
use super::redeem::expired_redirect;
use crate::filters;
use crate::services::{RedemptionPass, SharedSession};
use crate::state::AppState;

/// Pass carried in the query string.
#[derive(Debug, Deserialize)]
pub struct PassQuery {
    #[serde(default)]
    pub pass: String,
    /// The visitor dismissed the card modal.
    #[serde(default)]
    pub closed: bool,
}

/// Pass carried in a hidden form field.
#[derive(Debug, Deserialize)]
pub struct PassForm {
    #[serde(default)]
    pub pass: String,
}

/// Email step form data.
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub email: String,
}

/// Code step form data.
#[derive(Debug, Deserialize)]
pub struct CodeForm {
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub code: String,
}

/// Verification page template.
///
/// Once the flow is verified the business card form is rendered as a modal
/// on top of it.
#[derive(Template, WebTemplate)]
#[template(path = "verify/page.html")]
pub struct VerifyTemplate {
    pub pass: String,
    pub phase: Phase,
    pub redemption_code: String,
    pub email: String,
    pub email_input: String,
    pub code: String,
    pub resend_in: u64,
    pub notice: Option<Notice>,
    pub errors: FieldErrors,
    pub card: Option<CardFormView>,
}

impl VerifyTemplate {
    /// Render the session as it stands at `now`.
    #[must_use]
    pub fn new(pass: &str, session: &VerificationSession, now: Instant) -> Self {
        let email = session.email().map(ToString::to_string).unwrap_or_default();
        let card = (session.phase() == Phase::Verified).then(CardFormView::blank);
        Self {
            pass: pass.to_owned(),
            phase: session.phase(),
            redemption_code: session.redemption_code().to_string(),
            email_input: email.clone(),
            email,
            code: session.code().to_string(),
            resend_in: session.resend_remaining_secs(now),
            notice: None,
            errors: FieldErrors::new(),
            card,
        }
    }

    #[must_use]
    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice;
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn with_email_input(mut self, email_input: String) -> Self {
        self.email_input = email_input;
        self
    }

    /// Hide the card modal; whatever was typed into it is gone.
    #[must_use]
    pub fn without_card(mut self) -> Self {
        self.card = None;
        self
    }

    /// Replace the card form, keeping it only while the flow is verified.
    #[must_use]
    pub fn with_card(mut self, card: CardFormView) -> Self {
        if self.phase == Phase::Verified {
            self.card = Some(card);
        }
        self
    }
}

/// Resolve a pass to its open flow, or send the visitor back to the gate.
pub(crate) async fn resolve_flow(
    state: &AppState,
    token: &str,
) -> Result<(RedemptionPass, SharedSession), Redirect> {
    let pass = state.passes().verify(token).map_err(|e| {
        tracing::info!(error = %e, "Redemption pass refused");
        expired_redirect()
    })?;

    let Some(session) = state.flows().get(&pass.flow_id).await else {
        tracing::info!(flow_id = %pass.flow_id, "Redemption pass points at a closed flow");
        return Err(expired_redirect());
    };

    if session.with(|s| *s.redemption_code() != pass.code) {
        tracing::warn!(flow_id = %pass.flow_id, "Redemption pass names another event code");
        return Err(expired_redirect());
    }

    Ok((pass, session))
}

/// Render the flow's page at the current instant.
pub(crate) fn page(pass: &str, session: &SharedSession) -> VerifyTemplate {
    session.with(|s| VerifyTemplate::new(pass, s, Instant::now()))
}

/// Turn the result of settling a ticket into the notice to show.
///
/// A superseded completion shows nothing; the newer call owns the page.
fn settled(result: Result<Notice, FlowError>) -> Option<Notice> {
    match result {
        Ok(notice) => Some(notice),
        Err(e) => {
            tracing::debug!(error = %e, "Stale completion ignored");
            None
        }
    }
}

/// Verification page.
#[instrument(skip(state, query))]
pub async fn show(State(state): State<AppState>, Query(query): Query<PassQuery>) -> Response {
    match resolve_flow(&state, &query.pass).await {
        Ok((_, session)) if query.closed => {
            page(&query.pass, &session).without_card().into_response()
        }
        Ok((_, session)) => page(&query.pass, &session).into_response(),
        Err(redirect) => redirect.into_response(),
    }
}

/// Request a one-time code for the entered email.
#[instrument(skip(state, form))]
pub async fn request_code(State(state): State<AppState>, Form(form): Form<EmailForm>) -> Response {
    let session = match resolve_flow(&state, &form.pass).await {
        Ok((_, session)) => session,
        Err(redirect) => return redirect.into_response(),
    };

    let Ok(email) = Email::parse(&form.email) else {
        let mut errors = FieldErrors::new();
        errors.insert("email", "Invalid email address");
        return page(&form.pass, &session)
            .with_errors(errors)
            .with_email_input(form.email)
            .into_response();
    };

    let ticket = match session.with(|s| s.begin_code_request(email.clone())) {
        Ok(ticket) => ticket,
        Err(e) => {
            tracing::debug!(error = %e, "Code request refused");
            return page(&form.pass, &session).into_response();
        }
    };

    let result = state.backend().request_code(&email).await;

    let notice = session.with(|s| match result {
        Ok(()) => {
            tracing::info!(email = %email, "Verification code sent");
            s.code_sent(ticket, Instant::now())
                .map(|()| Notice::success(CODE_SENT))
        }
        Err(e) => {
            tracing::error!(email = %email, error = %e, "Failed to send verification code");
            s.code_request_failed(ticket)
                .map(|()| Notice::error(SEND_FAILED))
        }
    });

    let failed = notice.as_ref().is_ok_and(Notice::is_error);
    let view = page(&form.pass, &session).with_notice(settled(notice));
    if failed {
        view.with_email_input(form.email).into_response()
    } else {
        view.into_response()
    }
}

/// Check the entered one-time code.
#[instrument(skip(state, form))]
pub async fn check_code(State(state): State<AppState>, Form(form): Form<CodeForm>) -> Response {
    let session = match resolve_flow(&state, &form.pass).await {
        Ok((_, session)) => session,
        Err(redirect) => return redirect.into_response(),
    };

    let code = OtpCode::from_input(&form.code);
    let (ticket, email) = match session.with(|s| s.begin_verify(code.clone())) {
        Ok(started) => started,
        Err(e) => {
            tracing::debug!(error = %e, "Code check refused");
            return page(&form.pass, &session).into_response();
        }
    };

    let result = state.backend().verify_code(&email, &code).await;

    let notice = session.with(|s| match result {
        Ok(true) => {
            tracing::info!(email = %email, "Verification code accepted");
            s.code_verified(ticket)
                .map(|()| Notice::success(CODE_VERIFIED))
        }
        Ok(false) => {
            tracing::info!(email = %email, "Verification code rejected");
            s.code_rejected(ticket)
                .map(|()| Notice::error(INVALID_CODE))
        }
        Err(e) => {
            tracing::error!(email = %email, error = %e, "Verification code check failed");
            s.code_rejected(ticket)
                .map(|()| Notice::error(VERIFY_UNAVAILABLE))
        }
    });

    page(&form.pass, &session)
        .with_notice(settled(notice))
        .into_response()
}

/// Send the code again once the cooldown has run out.
///
/// The cooldown restarts before the backend call, so a failed resend still
/// waits the full 30 seconds.
#[instrument(skip(state, form))]
pub async fn resend_code(State(state): State<AppState>, Form(form): Form<PassForm>) -> Response {
    let session = match resolve_flow(&state, &form.pass).await {
        Ok((_, session)) => session,
        Err(redirect) => return redirect.into_response(),
    };

    let (ticket, email) = match session.with(|s| s.begin_resend(Instant::now())) {
        Ok(started) => started,
        Err(e) => {
            tracing::debug!(error = %e, "Resend refused");
            return page(&form.pass, &session).into_response();
        }
    };

    let result = state.backend().request_code(&email).await;

    let notice = session.with(|s| {
        s.resend_finished(ticket).map(|()| match result {
            Ok(()) => {
                tracing::info!(email = %email, "Verification code resent");
                Notice::success(CODE_SENT)
            }
            Err(e) => {
                tracing::error!(email = %email, error = %e, "Failed to resend verification code");
                Notice::error(SEND_FAILED)
            }
        })
    });

    page(&form.pass, &session)
        .with_notice(settled(notice))
        .into_response()
}

/// Go back to the email step.
#[instrument(skip(state, form))]
pub async fn back_to_email(State(state): State<AppState>, Form(form): Form<PassForm>) -> Response {
    let session = match resolve_flow(&state, &form.pass).await {
        Ok((_, session)) => session,
        Err(redirect) => return redirect.into_response(),
    };

    if let Err(e) = session.with(VerificationSession::back_to_email) {
        tracing::debug!(error = %e, "Back to email refused");
    }

    page(&form.pass, &session).into_response()
}
