//! One-shot notices carried in the session across a redirect.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

const TOASTS_KEY: &str = "toasts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.level {
            ToastLevel::Success => "toast toast-success",
            ToastLevel::Error => "toast toast-error",
            ToastLevel::Info => "toast toast-info",
        }
    }
}

/// Queue a toast for the next rendered page.
pub async fn push_toast(session: &Session, toast: Toast) {
    let mut queued: Vec<Toast> = session.get(TOASTS_KEY).await.ok().flatten().unwrap_or_default();
    queued.push(toast);
    if let Err(e) = session.insert(TOASTS_KEY, queued).await {
        tracing::warn!(error = %e, "Failed to store toast in session");
    }
}

/// Drain every queued toast.
pub async fn take_toasts(session: &Session) -> Vec<Toast> {
    session
        .remove::<Vec<Toast>>(TOASTS_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn toasts_are_drained_once_in_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        push_toast(&session, Toast::success("Client created")).await;
        push_toast(&session, Toast::info("Scheduler is stopped")).await;

        let toasts = take_toasts(&session).await;
        assert_eq!(
            toasts,
            vec![Toast::success("Client created"), Toast::info("Scheduler is stopped")]
        );
        assert!(take_toasts(&session).await.is_empty());
    }

    #[test]
    fn css_class_follows_level() {
        assert_eq!(Toast::error("x").css_class(), "toast toast-error");
    }
}
