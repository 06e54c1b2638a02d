pub mod config;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod views;

use service_core::fineract::FineractClient;
use service_core::middleware::rate_limit::IpRateLimiter;

/// Shared application state.
///
/// `fineract` holds no credentials; each request derives a client bound to
/// the signed-in user's key.
#[derive(Clone)]
pub struct AppState {
    pub fineract: FineractClient,
    pub login_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(fineract: FineractClient, login_limiter: IpRateLimiter) -> Self {
        Self {
            fineract,
            login_limiter,
        }
    }
}
