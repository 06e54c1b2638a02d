//! Roles and their permission grants (`/roles`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient};
use super::error::FineractError;
use super::normalize::into_items;
use super::permissions::{Permission, PermissionUpdate};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleRequest {
    pub name: String,
    pub description: String,
}

/// `GET /roles/{id}/permissions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissions {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permission_usage_data: Vec<Permission>,
}

impl FineractClient {
    pub async fn list_roles(&self) -> Result<Vec<Role>, FineractError> {
        let value = self.get_value("roles", &[]).await?;
        into_items(value)
    }

    pub async fn get_role(&self, role_id: i64) -> Result<Role, FineractError> {
        self.get_json(&format!("roles/{role_id}"), &[]).await
    }

    pub async fn create_role(&self, request: &RoleRequest) -> Result<CommandResult, FineractError> {
        let result: CommandResult = self.post_json("roles", &[], request).await?;
        tracing::info!(role_id = ?result.resource_id, name = %request.name, "Role created");
        Ok(result)
    }

    pub async fn update_role(
        &self,
        role_id: i64,
        request: &RoleRequest,
    ) -> Result<CommandResult, FineractError> {
        self.put_json(&format!("roles/{role_id}"), request).await
    }

    pub async fn delete_role(&self, role_id: i64) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("roles/{role_id}")).await
    }

    /// `command=enable` or `command=disable`.
    pub async fn set_role_enabled(
        &self,
        role_id: i64,
        enabled: bool,
    ) -> Result<CommandResult, FineractError> {
        let command = if enabled { "enable" } else { "disable" };
        let result = self
            .command(&format!("roles/{role_id}"), command, &serde_json::json!({}))
            .await?;
        tracing::info!(role_id, command, "Role state changed");
        Ok(result)
    }

    pub async fn role_permissions(&self, role_id: i64) -> Result<RolePermissions, FineractError> {
        self.get_json(&format!("roles/{role_id}/permissions"), &[])
            .await
    }

    /// Send only the grants that differ from what the role currently has.
    pub async fn update_role_permissions(
        &self,
        role_id: i64,
        current: &[Permission],
        desired: &BTreeMap<String, bool>,
    ) -> Result<Option<CommandResult>, FineractError> {
        let update = PermissionUpdate::diff(current, desired);
        if update.is_empty() {
            return Ok(None);
        }
        let result = self
            .put_json(&format!("roles/{role_id}/permissions"), &update)
            .await?;
        tracing::info!(role_id, changed = update.len(), "Role permissions updated");
        Ok(Some(result))
    }
}
