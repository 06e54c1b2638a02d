//! Permissions and the maker-checker (dual control) flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient};
use super::error::FineractError;
use super::normalize::into_items;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub grouping: String,
    pub code: String,
    pub entity_name: Option<String>,
    pub action_name: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

/// Body for the bulk `PUT` endpoints: `{ "permissions": { CODE: bool } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionUpdate {
    pub permissions: BTreeMap<String, bool>,
}

impl PermissionUpdate {
    /// Codes whose desired flag differs from the current one.
    ///
    /// Codes absent from `desired` are treated as unchecked, which is how an
    /// HTML form reports a cleared checkbox.
    pub fn diff(current: &[Permission], desired: &BTreeMap<String, bool>) -> Self {
        let permissions = current
            .iter()
            .filter_map(|p| {
                let wanted = desired.get(&p.code).copied().unwrap_or(false);
                (wanted != p.selected).then(|| (p.code.clone(), wanted))
            })
            .collect();
        Self { permissions }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }
}

/// Permissions grouped for display, groups and codes in alphabetical order.
pub fn group_permissions(permissions: &[Permission]) -> BTreeMap<String, Vec<Permission>> {
    let mut groups: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        groups
            .entry(permission.grouping.clone())
            .or_default()
            .push(permission.clone());
    }
    for items in groups.values_mut() {
        items.sort_by(|a, b| a.code.cmp(&b.code));
    }
    groups
}

impl FineractClient {
    /// `GET /permissions`, optionally limited to maker-checker capable codes.
    pub async fn list_permissions(
        &self,
        maker_checkerable: bool,
    ) -> Result<Vec<Permission>, FineractError> {
        let query = if maker_checkerable {
            vec![("makerCheckerable", "true".to_string())]
        } else {
            vec![]
        };
        let value = self.get_value("permissions", &query).await?;
        into_items(value)
    }

    /// Toggle maker-checker on the codes that changed.
    pub async fn update_maker_checker(
        &self,
        current: &[Permission],
        desired: &BTreeMap<String, bool>,
    ) -> Result<Option<CommandResult>, FineractError> {
        let update = PermissionUpdate::diff(current, desired);
        if update.is_empty() {
            return Ok(None);
        }
        let result = self.put_json("permissions", &update).await?;
        tracing::info!(changed = update.len(), "Maker-checker settings updated");
        Ok(Some(result))
    }
}
