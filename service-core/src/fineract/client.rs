//! HTTP plumbing shared by every Fineract resource module.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FineractError;
use super::retry::{RetryConfig, retry_request};
use crate::observability::trace_context::inject_trace_context;

/// Header carrying the Fineract tenant identifier (`Fineract-Platform-TenantId`).
pub const TENANT_HEADER: &str = "fineract-platform-tenantid";

/// Connection settings for a Fineract deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct FineractSettings {
    /// Base URL including the API prefix, e.g. `https://host/fineract-provider/api/v1`.
    pub url: String,
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Self-signed certificates are the norm on development Fineract installs.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_tenant_id() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl FineractSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tenant_id: default_tenant_id(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
            retry: RetryConfig::default(),
        }
    }
}

/// Receives one callback per completed Fineract call.
pub trait CallObserver: Send + Sync {
    fn observe(&self, method: &Method, status: Option<u16>, elapsed: Duration);
}

/// Result of any Fineract write command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub office_id: Option<i64>,
    pub client_id: Option<i64>,
    pub loan_id: Option<i64>,
    pub savings_id: Option<i64>,
    pub resource_id: Option<i64>,
    pub resource_identifier: Option<String>,
    #[serde(default)]
    pub changes: Value,
}

/// Fineract's `{ id, code, value }` enumeration shape (statuses, types).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub id: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default, alias = "name")]
    pub value: String,
}

/// The signed-in Fineract user returned by `POST /authentication`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub username: String,
    pub user_id: i64,
    #[serde(rename = "base64EncodedAuthenticationKey")]
    pub auth_key: String,
    #[serde(default)]
    pub authenticated: bool,
    pub office_id: Option<i64>,
    pub office_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleRef>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: i64,
    pub name: String,
}

/// Typed client for the Fineract REST API.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct FineractClient {
    http: Client,
    settings: Arc<FineractSettings>,
    auth_key: Option<Arc<Secret<String>>>,
    observer: Option<Arc<dyn CallObserver>>,
}

impl FineractClient {
    pub fn new(settings: FineractSettings) -> Result<Self, FineractError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        tracing::info!(
            url = %settings.url,
            tenant_id = %settings.tenant_id,
            "Fineract client configured"
        );

        Ok(Self {
            http,
            settings: Arc::new(settings),
            auth_key: None,
            observer: None,
        })
    }

    /// Attach a metrics observer.
    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// A client that authenticates as the holder of `auth_key`.
    pub fn with_auth_key(&self, auth_key: impl Into<String>) -> Self {
        Self {
            auth_key: Some(Arc::new(Secret::new(auth_key.into()))),
            ..self.clone()
        }
    }

    pub fn settings(&self) -> &FineractSettings {
        &self.settings
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_key.is_some()
    }

    /// Exchange a username and password for an authentication key.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, FineractError> {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let user: AuthenticatedUser = self.post_json("authentication", &[], &body).await?;

        if !user.authenticated {
            tracing::warn!(username = %username, "Fineract refused authentication");
            return Err(FineractError::Unauthorized);
        }

        tracing::info!(username = %user.username, user_id = user.user_id, "Fineract user authenticated");
        Ok(user)
    }

    /// GET a resource, retrying transient failures.
    pub async fn get_value(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FineractError> {
        retry_request(&self.settings.retry, path, || {
            self.send(Method::GET, path, query, None)
        })
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FineractError> {
        let value = self.get_value(path, query).await?;
        decode(value)
    }

    pub async fn post_json<B, T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, FineractError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self.send(Method::POST, path, query, Some(&body)).await?;
        decode(value)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, FineractError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self.send(Method::PUT, path, &[], Some(&body)).await?;
        decode(value)
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FineractError> {
        let value = self.send(Method::DELETE, path, &[], None).await?;
        decode(value)
    }

    /// POST `path?command=<command>`.
    pub async fn command<B, T>(&self, path: &str, command: &str, body: &B) -> Result<T, FineractError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json(path, &[("command", command.to_string())], body)
            .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, FineractError> {
        let url = self.url(path);
        let started = Instant::now();

        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(tenant) = HeaderValue::from_str(&self.settings.tenant_id) {
            headers.insert(HeaderName::from_static(TENANT_HEADER), tenant);
        }
        if let Some(key) = &self.auth_key {
            let mut value = HeaderValue::from_str(&format!("Basic {}", key.expose_secret()))
                .map_err(|_| FineractError::Unauthorized)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut request = self
            .http
            .request(method.clone(), &url)
            .headers(headers)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.observe(&method, None, started.elapsed());
                tracing::error!(method = %method, path = %path, error = %e, "Fineract request failed");
                return Err(FineractError::Transport(e));
            }
        };

        let status = response.status();
        let text = response.text().await?;
        let elapsed = started.elapsed();
        self.observe(&method, Some(status.as_u16()), elapsed);

        tracing::debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fineract response"
        );

        if !status.is_success() {
            let err = FineractError::from_response(status, &text);
            tracing::warn!(method = %method, path = %path, status = status.as_u16(), error = %err, "Fineract call rejected");
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(method = %method, path = %path, error = %e, "Fineract body is not JSON");
            FineractError::Decode(e.to_string())
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn observe(&self, method: &Method, status: Option<u16>, elapsed: Duration) {
        if let Some(observer) = &self.observer {
            observer.observe(method, status, elapsed);
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, FineractError> {
    if value.is_null() {
        // Some commands answer with an empty body.
        return serde_json::from_value(Value::Null)
            .or_else(|_| serde_json::from_value(Value::Object(Default::default())))
            .map_err(|e| FineractError::Decode(e.to_string()));
    }
    serde_json::from_value(value).map_err(|e| FineractError::Decode(e.to_string()))
}

/// Percent-encode a single path segment (report and datatable names contain spaces).
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_url_and_path() {
        let client =
            FineractClient::new(FineractSettings::new("https://host/fineract-provider/api/v1/"))
                .unwrap();
        assert_eq!(
            client.url("/clients/1"),
            "https://host/fineract-provider/api/v1/clients/1"
        );
        assert_eq!(
            client.url("offices"),
            "https://host/fineract-provider/api/v1/offices"
        );
    }

    #[test]
    fn auth_key_is_scoped_to_the_clone() {
        let client = FineractClient::new(FineractSettings::new("http://localhost")).unwrap();
        let signed_in = client.with_auth_key("bWlmb3M6cGFzc3dvcmQ=");
        assert!(!client.is_authenticated());
        assert!(signed_in.is_authenticated());
    }

    #[test]
    fn segments_are_encoded() {
        assert_eq!(segment("Active Loans - Details"), "Active%20Loans%20-%20Details");
    }
}
