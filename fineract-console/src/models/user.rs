use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use service_core::fineract::{AuthenticatedUser, FineractClient};
use tower_sessions::Session;

use crate::models::toast::{push_toast, take_toasts, Toast};
use crate::AppState;

const USER_KEY: &str = "user";

/// What the session remembers about the signed-in operator.
///
/// The Fineract key is the only credential kept; the password never is.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub user_id: i64,
    pub office_name: Option<String>,
    auth_key: String,
}

impl From<AuthenticatedUser> for SessionUser {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            username: user.username,
            user_id: user.user_id,
            office_name: user.office_name,
            auth_key: user.auth_key,
        }
    }
}

impl SessionUser {
    pub async fn store(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.cycle_id().await?;
        session.insert(USER_KEY, self).await
    }

    pub async fn load(session: &Session) -> Option<Self> {
        session.get(USER_KEY).await.ok().flatten()
    }
}

/// Signed-in operator plus a Fineract client acting on their behalf.
#[derive(Clone)]
pub struct AuthUser {
    pub username: String,
    pub user_id: i64,
    pub office_name: Option<String>,
    pub client: FineractClient,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Failed to extract session").into_response())?;

        let Some(user) = SessionUser::load(&session).await else {
            return Err(Redirect::to("/login").into_response());
        };

        Ok(AuthUser {
            client: state.fineract.with_auth_key(user.auth_key),
            username: user.username,
            user_id: user.user_id,
            office_name: user.office_name,
            session,
        })
    }
}

impl AuthUser {
    pub async fn toast(&self, toast: Toast) {
        push_toast(&self.session, toast).await;
    }

    pub async fn take_toasts(&self) -> Vec<Toast> {
        take_toasts(&self.session).await
    }

    /// Post/redirect/get: queue a success toast and send the browser on.
    pub async fn done(&self, message: impl Into<String>, to: &str) -> Response {
        self.toast(Toast::success(message)).await;
        Redirect::to(to).into_response()
    }

    /// Queue an error toast and redirect.
    pub async fn failed(&self, message: impl Into<String>, to: &str) -> Response {
        self.toast(Toast::error(message)).await;
        Redirect::to(to).into_response()
    }
}
