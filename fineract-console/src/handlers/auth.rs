use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::fineract::FineractError;
use tower_sessions::Session;

use crate::models::toast::{take_toasts, Toast};
use crate::models::user::SessionUser;
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub tenant: String,
    pub username: String,
    pub error: Option<String>,
    pub toasts: Vec<Toast>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub expired: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: Secret<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let mut toasts = Vec::new();
    if query.expired {
        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to clear expired session");
        }
        toasts.push(Toast::info("Your session has expired, please sign in again"));
    } else {
        toasts = take_toasts(&session).await;
    }

    LoginTemplate {
        tenant: state.fineract.settings().tenant_id.clone(),
        username: String::new(),
        error: None,
        toasts,
    }
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Form(payload): Form<LoginRequest>,
) -> Response {
    let username = payload.username.trim().to_string();
    let failed = |status: StatusCode, message: String| {
        (
            status,
            LoginTemplate {
                tenant: state.fineract.settings().tenant_id.clone(),
                username: username.clone(),
                error: Some(message),
                toasts: Vec::new(),
            },
        )
            .into_response()
    };

    if username.is_empty() || payload.password.expose_secret().is_empty() {
        return failed(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Enter your username and password".to_string(),
        );
    }

    match state
        .fineract
        .authenticate(&username, payload.password.expose_secret())
        .await
    {
        Ok(user) => {
            tracing::info!(username = %user.username, user_id = user.user_id, "Operator signed in");
            let user = SessionUser::from(user);
            if let Err(e) = user.store(&session).await {
                tracing::error!(error = %e, "Failed to store session");
                return failed(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not start a session, please try again".to_string(),
                );
            }
            Redirect::to("/dashboard").into_response()
        }
        Err(FineractError::Unauthorized) => {
            tracing::warn!(username = %username, "Sign-in rejected");
            failed(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            )
        }
        Err(err) => {
            tracing::warn!(username = %username, error = %err, "Sign-in failed");
            // Disabled or locked accounts come back as 4xx; anything else
            // means Fineract itself failed.
            let status = match err.status() {
                Some(status) if status.is_client_error() => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            };
            failed(status, err.user_message())
        }
    }
}

pub async fn logout_handler(session: Session) -> impl IntoResponse {
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to clear session on sign-out");
    }
    Redirect::to("/login")
}
