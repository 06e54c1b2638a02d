pub mod app;
pub mod asset_owners;
pub mod auth;
pub mod batch;
pub mod clients;
pub mod collection_sheet;
pub mod datatables;
pub mod delinquency;
pub mod jobs;
pub mod loans;
pub mod maker_checker;
pub mod metrics;
pub mod provisioning;
pub mod reports;
pub mod roles;
pub mod tellers;
pub mod users;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::fineract::FineractError;

use crate::forms::FormErrors;
use crate::models::toast::Toast;
use crate::models::user::AuthUser;
use crate::views::{Block, Link, Page};

pub const PAGE_SIZE: u32 = 20;

pub struct NavItem {
    pub key: &'static str,
    pub label: &'static str,
    pub href: &'static str,
}

const NAV: &[NavItem] = &[
    NavItem { key: "dashboard", label: "Dashboard", href: "/dashboard" },
    NavItem { key: "clients", label: "Clients", href: "/clients" },
    NavItem { key: "loans", label: "Loans", href: "/loans" },
    NavItem { key: "collection-sheet", label: "Collection sheet", href: "/collection-sheet" },
    NavItem { key: "tellers", label: "Tellers", href: "/tellers" },
    NavItem { key: "asset-owners", label: "Asset owners", href: "/asset-owners" },
    NavItem { key: "users", label: "Users", href: "/users" },
    NavItem { key: "roles", label: "Roles", href: "/roles" },
    NavItem { key: "maker-checker", label: "Maker-checker", href: "/maker-checker" },
    NavItem { key: "reports", label: "Reports", href: "/reports" },
    NavItem { key: "jobs", label: "Scheduler jobs", href: "/jobs" },
    NavItem { key: "provisioning", label: "Provisioning", href: "/provisioning" },
    NavItem { key: "delinquency", label: "Delinquency", href: "/delinquency" },
    NavItem { key: "datatables", label: "Data tables", href: "/datatables" },
    NavItem { key: "batch", label: "Batch", href: "/batch" },
];

/// Chrome shared by every signed-in page.
pub struct Layout {
    pub username: String,
    pub office_name: String,
    pub section: &'static str,
    pub toasts: Vec<Toast>,
    pub nav: &'static [NavItem],
}

impl Layout {
    pub async fn new(user: &AuthUser, section: &'static str) -> Self {
        Self {
            username: user.username.clone(),
            office_name: user.office_name.clone().unwrap_or_default(),
            section,
            toasts: user.take_toasts().await,
            nav: NAV,
        }
    }
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub layout: Layout,
    pub page: Page,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub reason: String,
    pub message: String,
}

pub async fn render(user: &AuthUser, page: Page) -> Response {
    render_status(user, StatusCode::OK, page).await
}

pub async fn render_status(user: &AuthUser, status: StatusCode, page: Page) -> Response {
    let layout = Layout::new(user, page.section).await;
    (status, PageTemplate { layout, page }).into_response()
}

/// Re-render a rejected form with an error toast.
pub async fn reject(user: &AuthUser, errors: &FormErrors, page: Page) -> Response {
    user.toast(Toast::error(errors.summary())).await;
    render_status(user, StatusCode::UNPROCESSABLE_ENTITY, page).await
}

/// Field errors for a failed write, unless the session is no longer valid.
pub fn form_errors(err: FineractError) -> Result<FormErrors, PageError> {
    match err {
        FineractError::Unauthorized => Err(PageError::from(err)),
        other => {
            tracing::info!(error = %other, "Fineract rejected a form submission");
            Ok(FormErrors::from(&other))
        }
    }
}

/// Redirect with a success toast, or with the error message as a toast.
pub async fn outcome<T>(
    user: &AuthUser,
    result: Result<T, FineractError>,
    success: impl Into<String>,
    to: &str,
) -> Result<Response, PageError> {
    match result {
        Ok(_) => Ok(user.done(success, to).await),
        Err(err) => failure(user, err, to).await,
    }
}

/// Redirect with the Fineract message as an error toast.
pub async fn failure(user: &AuthUser, err: FineractError, to: &str) -> Result<Response, PageError> {
    if matches!(err, FineractError::Unauthorized) {
        return Err(err.into());
    }
    tracing::info!(error = %err, "Fineract command failed");
    Ok(user.failed(err.user_message(), to).await)
}

/// A GET confirmation step in front of a destructive POST.
pub async fn confirm(
    user: &AuthUser,
    section: &'static str,
    title: &str,
    message: impl Into<String>,
    action: &str,
    back: &str,
) -> Response {
    let page = Page::new(section, title)
        .text(message)
        .block(Block::Actions(vec![
            Link::post("Confirm", action).danger(),
            Link::get("Cancel", back),
        ]));
    render(user, page).await
}

#[derive(Debug, Deserialize, Default)]
pub struct Paging {
    #[serde(default)]
    pub offset: u32,
}

/// An [`AppError`] rendered as an HTML page.
///
/// A 401 means the stored Fineract key is no longer accepted, so the
/// operator is sent back to the login page, which clears the session.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError(err)
    }
}

impl From<FineractError> for PageError {
    fn from(err: FineractError) -> Self {
        PageError(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status == StatusCode::UNAUTHORIZED {
            return Redirect::to("/login?expired=true").into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Page failed");
        } else {
            tracing::warn!(error = %self.0, "Page request rejected");
        }
        let template = ErrorTemplate {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.0.user_message(),
        };
        (status, template).into_response()
    }
}
