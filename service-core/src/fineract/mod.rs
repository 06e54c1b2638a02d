//! Typed client for the Fineract REST API.
//!
//! [`FineractClient`] carries the connection settings, the tenant and the
//! signed-in user's key; each resource module adds its operations to it
//! through an `impl FineractClient` block.

pub mod asset_owners;
pub mod batch;
mod client;
pub mod clients;
pub mod collection_sheet;
pub mod datatables;
pub mod dates;
pub mod delinquency;
mod error;
pub mod jobs;
pub mod loans;
pub mod normalize;
pub mod offices;
pub mod permissions;
pub mod provisioning;
pub mod reports;
pub mod retry;
pub mod roles;
pub mod tellers;
pub mod users;

pub use client::{
    AuthenticatedUser, CallObserver, CommandResult, EnumOption, FineractClient, FineractSettings,
    RoleRef, TENANT_HEADER, segment,
};
pub use error::{FieldError, FineractError};
pub use normalize::Page;
pub use retry::RetryConfig;
