//! Redemption gate route handlers.
//!
//! The gate asks the backend whether an event code is valid. An accepted
//! code opens a verification flow and the visitor is redirected to it with
//! a freshly signed pass; anything else re-renders the gate with a notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use eventconnect_core::flow::gate::PASS_EXPIRED;
use eventconnect_core::{GateOutcome, Notice, RedemptionCode, RedemptionCodeError};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::state::AppState;

/// Gate page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct GateQuery {
    /// Set when the visitor was sent back because their pass stopped working.
    #[serde(default)]
    pub expired: bool,
}

/// Event code form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemForm {
    #[serde(default)]
    pub event_code: String,
}

/// Redemption gate template.
#[derive(Template, WebTemplate)]
#[template(path = "gate.html")]
pub struct GateTemplate {
    pub event_code: String,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

/// Where a visitor lands when their pass can no longer be honoured.
#[must_use]
pub fn expired_redirect() -> Redirect {
    Redirect::to("/?expired=true")
}

/// Redemption gate page.
#[instrument]
pub async fn show(Query(query): Query<GateQuery>) -> GateTemplate {
    GateTemplate {
        event_code: String::new(),
        error: None,
        notice: query.expired.then(|| Notice::error(PASS_EXPIRED)),
    }
}

/// Submit an event code.
///
/// A blank code never reaches the backend. Transport and parse failures
/// are reported as [`GateOutcome::Unavailable`], distinct from a rejection.
#[instrument(skip(state, form))]
pub async fn redeem(State(state): State<AppState>, Form(form): Form<RedeemForm>) -> Response {
    let code = match RedemptionCode::parse(&form.event_code) {
        Ok(code) => code,
        Err(e) => {
            return GateTemplate {
                event_code: form.event_code,
                error: Some(field_message(&e).to_string()),
                notice: None,
            }
            .into_response();
        }
    };

    let outcome = match state.backend().validate_event_code(&code).await {
        Ok(is_valid) => GateOutcome::from_is_valid(is_valid),
        Err(e) => {
            tracing::error!(error = %e, "Event code validation failed");
            GateOutcome::Unavailable
        }
    };

    if outcome != GateOutcome::Accepted {
        tracing::info!(code = %code, outcome = ?outcome, "Event code not accepted");
        return GateTemplate {
            event_code: code.as_str().to_owned(),
            error: None,
            notice: outcome.notice(),
        }
        .into_response();
    }

    let flow_id = state.flows().open(code.clone()).await;
    match state.passes().issue(flow_id, &code) {
        Ok(pass) => {
            tracing::info!(code = %code, flow_id = %flow_id, "Event code accepted");
            let flow = flow_id.to_string();
            add_breadcrumb(
                "redemption",
                "Event code accepted",
                Some(&[("flow_id", flow.as_str())]),
            );
            Redirect::to(&format!("/verify?pass={pass}")).into_response()
        }
        Err(e) => {
            state.flows().close(&flow_id).await;
            AppError::Internal(e.to_string()).into_response()
        }
    }
}

const fn field_message(error: &RedemptionCodeError) -> &'static str {
    match error {
        RedemptionCodeError::Empty => "Please enter your event code",
        RedemptionCodeError::TooLong { .. } => "Event code is too long",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_notice_only_when_flagged() {
        let page = show(Query(GateQuery { expired: true })).await;
        assert!(page.render().unwrap_or_default().contains(PASS_EXPIRED));

        let page = show(Query(GateQuery::default())).await;
        assert!(page.notice.is_none());
    }

    #[test]
    fn test_blank_code_message() {
        assert_eq!(
            field_message(&RedemptionCodeError::Empty),
            "Please enter your event code"
        );
    }
}
