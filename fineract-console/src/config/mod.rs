use serde::Deserialize;
use service_core::error::AppError;
use service_core::fineract::FineractSettings;
use service_core::middleware::rate_limit::RateLimitSettings;
use service_core::observability::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub fineract: FineractSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub login_rate_limit: RateLimitSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`; enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Idle time after which a session expires.
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
}

fn default_session_hours() -> i64 {
    8
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            secure_cookies: false,
            session_hours: default_session_hours(),
        }
    }
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let directory = service_core::config::configuration_directory("fineract-console")?;
    service_core::config::load(&directory)
}
