//! service-core: Fineract REST client and shared web infrastructure for the console.
pub mod config;
pub mod error;
pub mod fineract;
pub mod middleware;
pub mod observability;

pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
