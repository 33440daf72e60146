//! Coupon manager route handlers.
//!
//! Mutations follow post/redirect/get: the outcome is stored as a flash
//! notice and the listing is fetched again on the redirected request. The
//! create form is validated before any backend call; over HTMX an invalid
//! form swaps back in place without touching the listing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use eventconnect_core::pagination::{PageNav, Pagination};
use eventconnect_core::types::coupon::{
    COUPON_CREATED, COUPON_DELETED, COUPON_PUBLISHED, COUPON_UNPUBLISHED, CREATE_FAILED,
    DELETE_FAILED, FETCH_COUPONS_FAILED, STATUS_FAILED,
};
use eventconnect_core::{Coupon, CouponForm, CouponId, FieldErrors, Notice};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{ListingQuery, is_htmx, listing_url};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{AuthToken, set_flash, take_flash};
use crate::services::{BackendError, CouponPage, ListQuery};
use crate::state::AppState;

const COUPONS_PATH: &str = "/admin/coupons";

/// Coupon table fragment.
#[derive(Template, WebTemplate)]
#[template(path = "coupons/table.html")]
pub struct CouponTable {
    pub coupons: Vec<Coupon>,
    pub pagination: Pagination,
    pub nav: PageNav,
    pub search: String,
    pub notice: Option<Notice>,
    pub page_base: &'static str,
    pub target: &'static str,
    pub page_trigger: &'static str,
}

impl CouponTable {
    fn new(page: CouponPage, search: String, notice: Option<Notice>) -> Self {
        Self {
            coupons: page.coupons,
            nav: page.pagination.nav(),
            pagination: page.pagination,
            search,
            notice,
            page_base: COUPONS_PATH,
            target: "#coupon-table",
            page_trigger: "click",
        }
    }
}

/// Coupon creation form fragment.
#[derive(Template, WebTemplate)]
#[template(path = "coupons/form.html")]
pub struct CouponFormFragment {
    pub form: CouponForm,
    pub errors: FieldErrors,
}

impl CouponFormFragment {
    fn blank() -> Self {
        Self {
            form: CouponForm::default(),
            errors: FieldErrors::new(),
        }
    }
}

/// Coupon manager page template.
#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsTemplate {
    pub current_path: &'static str,
    pub search: String,
    pub notice: Option<Notice>,
    pub form: CouponFormFragment,
    pub table: CouponTable,
}

/// Delete confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "coupons/delete.html")]
pub struct DeleteConfirmTemplate {
    pub current_path: &'static str,
    pub id: CouponId,
    pub code: String,
    pub page: u32,
    pub search: String,
}

/// Where a mutation returns to, carried in hidden fields.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnTo {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: String,
}

impl ReturnTo {
    fn url(&self) -> String {
        listing_url(COUPONS_PATH, self.page.unwrap_or(1), &self.search)
    }
}

/// Publish toggle form data; `isPublished` is the requested new state.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishForm {
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: String,
}

/// Delete confirmation query.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: String,
}

/// Fetch the table; a refused credential ends the session, anything else
/// becomes a notice over an empty table.
async fn load_table(
    state: &AppState,
    token: &AuthToken,
    query: &ListingQuery,
) -> Result<CouponTable> {
    let list = ListQuery::new(query.page(), &query.search);
    match state.backend().list_coupons(token.secret(), &list).await {
        Ok(page) => Ok(CouponTable::new(page, list.search, None)),
        Err(BackendError::Unauthorized) => Err(AppError::session_expired()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch coupons");
            Ok(CouponTable::new(
                CouponPage::default(),
                list.search,
                Some(Notice::error(FETCH_COUPONS_FAILED)),
            ))
        }
    }
}

/// Coupon manager page.
///
/// GET /admin/coupons
#[instrument(skip(state, token, session))]
pub async fn index(
    State(state): State<AppState>,
    token: AuthToken,
    session: Session,
    Query(query): Query<ListingQuery>,
) -> Result<CouponsTemplate> {
    let notice = take_flash(&session).await;
    let table = load_table(&state, &token, &query).await?;
    Ok(CouponsTemplate {
        current_path: COUPONS_PATH,
        search: table.search.clone(),
        notice,
        form: CouponFormFragment::blank(),
        table,
    })
}

/// Table fragment for search and paging.
///
/// GET /admin/coupons/table
#[instrument(skip(state, token))]
pub async fn table(
    State(state): State<AppState>,
    token: AuthToken,
    Query(query): Query<ListingQuery>,
) -> Result<CouponTable> {
    load_table(&state, &token, &query)
        .await
        .map_err(AppError::in_fragment)
}

/// Create a coupon.
///
/// POST /admin/coupons
#[instrument(skip(state, token, session, headers, form))]
pub async fn create(
    State(state): State<AppState>,
    token: AuthToken,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let htmx = is_htmx(&headers);

    let coupon = match form.validate() {
        Ok(coupon) => coupon,
        Err(errors) if htmx => {
            return Ok(CouponFormFragment { form, errors }.into_response());
        }
        Err(errors) => {
            let table = load_table(&state, &token, &ListingQuery::default()).await?;
            return Ok(CouponsTemplate {
                current_path: COUPONS_PATH,
                search: String::new(),
                notice: None,
                form: CouponFormFragment { form, errors },
                table,
            }
            .into_response());
        }
    };

    let notice = match state.backend().create_coupon(token.secret(), &coupon).await {
        Ok(()) => {
            tracing::info!(code = %coupon.code, "Coupon created");
            Notice::success(COUPON_CREATED)
        }
        Err(BackendError::Unauthorized) => {
            let err = AppError::session_expired();
            return Err(if htmx { err.in_fragment() } else { err });
        }
        Err(e) => {
            tracing::error!(code = %coupon.code, error = %e, "Failed to create coupon");
            Notice::error(CREATE_FAILED)
        }
    };

    set_flash(&session, notice).await;
    Ok(back_to(COUPONS_PATH, htmx))
}

/// Publish or unpublish a coupon.
///
/// POST /admin/coupons/{id}/publish
#[instrument(skip(state, token, session, form))]
pub async fn publish(
    State(state): State<AppState>,
    token: AuthToken,
    session: Session,
    Path(id): Path<CouponId>,
    Form(form): Form<PublishForm>,
) -> Result<Response> {
    let notice = match state
        .backend()
        .set_published(token.secret(), &id, form.is_published)
        .await
    {
        Ok(()) if form.is_published => Notice::success(COUPON_PUBLISHED),
        Ok(()) => Notice::success(COUPON_UNPUBLISHED),
        Err(BackendError::Unauthorized) => return Err(AppError::session_expired()),
        Err(e) => {
            tracing::error!(id = %id, error = %e, "Failed to update coupon status");
            Notice::error(STATUS_FAILED)
        }
    };

    set_flash(&session, notice).await;
    let return_to = ReturnTo {
        page: form.page,
        search: form.search,
    };
    Ok(Redirect::to(&return_to.url()).into_response())
}

/// Ask before deleting a coupon.
///
/// GET /admin/coupons/{id}/delete
#[instrument]
pub async fn confirm_delete(
    Path(id): Path<CouponId>,
    Query(query): Query<DeleteQuery>,
) -> DeleteConfirmTemplate {
    DeleteConfirmTemplate {
        current_path: COUPONS_PATH,
        id,
        code: query.code,
        page: query.page.unwrap_or(1),
        search: query.search,
    }
}

/// Delete a coupon.
///
/// POST /admin/coupons/{id}/delete
#[instrument(skip(state, token, session, form))]
pub async fn delete(
    State(state): State<AppState>,
    token: AuthToken,
    session: Session,
    Path(id): Path<CouponId>,
    Form(form): Form<ReturnTo>,
) -> Result<Response> {
    let notice = match state.backend().delete_coupon(token.secret(), &id).await {
        Ok(()) => {
            tracing::info!(id = %id, "Coupon deleted");
            Notice::success(COUPON_DELETED)
        }
        Err(BackendError::Unauthorized) => return Err(AppError::session_expired()),
        Err(e) => {
            tracing::error!(id = %id, error = %e, "Failed to delete coupon");
            Notice::error(DELETE_FAILED)
        }
    };

    set_flash(&session, notice).await;
    Ok(Redirect::to(&form.url()).into_response())
}

/// Redirect after a mutation, via `HX-Redirect` for HTMX requests.
fn back_to(location: &str, htmx: bool) -> Response {
    if !htmx {
        return Redirect::to(location).into_response();
    }
    match HeaderValue::from_str(location) {
        Ok(value) => (
            StatusCode::NO_CONTENT,
            [(HeaderName::from_static("hx-redirect"), value)],
        )
            .into_response(),
        Err(_) => Redirect::to(location).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn coupon(published: bool) -> Coupon {
        Coupon {
            id: CouponId::new("c1"),
            code: "SUMMIT24".to_string(),
            valid_from: "2024-05-01T00:00:00.000Z".to_string(),
            valid_to: "2024-05-03T00:00:00.000Z".to_string(),
            is_published: published,
        }
    }

    #[test]
    fn test_table_offers_opposite_publish_state() {
        let page = CouponPage {
            coupons: vec![coupon(false)],
            pagination: Pagination::default(),
        };
        let html = CouponTable::new(page, String::new(), None).render().unwrap();
        assert!(html.contains("2024-05-01"));
        assert!(html.contains("Unpublished"));
        assert!(html.contains("name=\"isPublished\" value=\"true\""));
        assert!(html.contains("/admin/coupons/c1/delete?code=SUMMIT24"));
    }

    #[test]
    fn test_page_links_fetch_without_delay() {
        let page = CouponPage {
            coupons: vec![coupon(true)],
            pagination: Pagination {
                total: 25,
                current_page: 2,
                total_pages: 3,
                per_page: 10,
            },
        };
        let html = CouponTable::new(page, "SUM".to_string(), None)
            .render()
            .unwrap();
        assert!(html.contains("<span class=\"current\" aria-current=\"page\">2</span>"));
        assert!(html.contains("/admin/coupons/table?page=3&amp;search=SUM"));
        assert!(html.contains("hx-trigger=\"click\""));
        assert!(!html.contains("delay:500ms"));
    }

    #[test]
    fn test_form_fragment_shows_date_error() {
        let form = CouponForm {
            code: "SUMMIT24".to_string(),
            valid_from: "2024-05-03".to_string(),
            valid_to: "2024-05-01".to_string(),
        };
        let errors = form.validate().unwrap_err();
        let html = CouponFormFragment { form, errors }.render().unwrap();
        assert!(html.contains("Valid to date cannot be earlier than valid from date"));
        assert!(html.contains("value=\"2024-05-03\""));
    }

    #[test]
    fn test_return_to_keeps_listing_position() {
        let to = ReturnTo {
            page: Some(3),
            search: "sum mit".to_string(),
        };
        assert_eq!(to.url(), "/admin/coupons?page=3&search=sum%20mit");
        assert_eq!(ReturnTo::default().url(), "/admin/coupons");
    }

    #[test]
    fn test_back_to_over_htmx() {
        let response = back_to(COUPONS_PATH, true);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get("hx-redirect").unwrap(), COUPONS_PATH);

        let response = back_to(COUPONS_PATH, false);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_delete_confirmation_page() {
        let page = confirm_delete(
            Path(CouponId::new("c1")),
            Query(DeleteQuery {
                code: "SUMMIT24".to_string(),
                page: Some(2),
                search: String::new(),
            }),
        )
        .await;
        let html = page.render().unwrap();
        assert!(html.contains("SUMMIT24"));
        assert!(html.contains("action=\"/admin/coupons/c1/delete\""));
        assert!(html.contains("name=\"page\" value=\"2\""));
    }
}
