//! Submitted business card listing.
//!
//! The dashboard is read-only. Its search box and page links refresh the
//! table fragment 500 ms after the last keystroke or click.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use eventconnect_core::pagination::{PageNav, Pagination};
use eventconnect_core::types::business_card::FETCH_CARDS_FAILED;
use eventconnect_core::{BusinessCard, Notice};
use tracing::instrument;

use super::ListingQuery;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::AuthToken;
use crate::services::{BackendError, BusinessCardPage, ListQuery};
use crate::state::AppState;

/// Business card table fragment.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/table.html")]
pub struct CardTable {
    pub cards: Vec<BusinessCard>,
    pub pagination: Pagination,
    pub nav: PageNav,
    pub search: String,
    pub notice: Option<Notice>,
    pub page_base: &'static str,
    pub target: &'static str,
    pub page_trigger: &'static str,
}

impl CardTable {
    fn new(page: BusinessCardPage, search: String, notice: Option<Notice>) -> Self {
        Self {
            cards: page.business_cards,
            nav: page.pagination.nav(),
            pagination: page.pagination,
            search,
            notice,
            page_base: "/admin/dashboard",
            target: "#card-table",
            page_trigger: "click delay:500ms",
        }
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub current_path: &'static str,
    pub search: String,
    pub table: CardTable,
}

/// Fetch the table; a refused credential ends the session, anything else
/// becomes a notice over an empty table.
async fn load_table(state: &AppState, token: &AuthToken, query: &ListingQuery) -> Result<CardTable> {
    let list = ListQuery::new(query.page(), &query.search);
    match state
        .backend()
        .list_business_cards(token.secret(), &list)
        .await
    {
        Ok(page) => Ok(CardTable::new(page, list.search, None)),
        Err(BackendError::Unauthorized) => Err(AppError::session_expired()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch business cards");
            Ok(CardTable::new(
                BusinessCardPage::default(),
                list.search,
                Some(Notice::error(FETCH_CARDS_FAILED)),
            ))
        }
    }
}

/// Dashboard page.
///
/// GET /admin/dashboard
#[instrument(skip(state, token))]
pub async fn show(
    State(state): State<AppState>,
    token: AuthToken,
    Query(query): Query<ListingQuery>,
) -> Result<DashboardTemplate> {
    let table = load_table(&state, &token, &query).await?;
    Ok(DashboardTemplate {
        current_path: "/admin/dashboard",
        search: table.search.clone(),
        table,
    })
}

/// Table fragment for search and paging.
///
/// GET /admin/dashboard/table
#[instrument(skip(state, token))]
pub async fn table(
    State(state): State<AppState>,
    token: AuthToken,
    Query(query): Query<ListingQuery>,
) -> Result<CardTable> {
    load_table(&state, &token, &query)
        .await
        .map_err(AppError::in_fragment)
}
