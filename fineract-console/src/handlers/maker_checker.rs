use std::collections::BTreeMap;

use askama::Template;
use axum::{
    response::{IntoResponse, Response},
    Form,
};
use service_core::fineract::permissions::{group_permissions, Permission};

use crate::handlers::{failure, Layout, PageError};
use crate::models::user::AuthUser;

#[derive(Template)]
#[template(path = "permissions.html")]
pub struct PermissionsTemplate {
    pub layout: Layout,
    pub title: String,
    pub intro: String,
    pub action: String,
    pub back: String,
    pub groups: Vec<PermissionGroup>,
}

pub struct PermissionGroup {
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl PermissionGroup {
    pub fn selected_count(&self) -> usize {
        self.permissions.iter().filter(|p| p.selected).count()
    }
}

pub fn groups(permissions: &[Permission]) -> Vec<PermissionGroup> {
    group_permissions(permissions)
        .into_iter()
        .map(|(name, permissions)| PermissionGroup { name, permissions })
        .collect()
}

/// Ticked boxes arrive as `CODE=true`; anything absent is unticked.
pub fn desired(form: Vec<(String, String)>) -> BTreeMap<String, bool> {
    form.into_iter()
        .map(|(code, value)| (code, value == "true"))
        .collect()
}

pub async fn show(user: AuthUser) -> Result<Response, PageError> {
    let permissions = user.client.list_permissions(true).await?;
    let template = PermissionsTemplate {
        layout: Layout::new(&user, "maker-checker").await,
        title: "Maker-checker".to_string(),
        intro: "Ticked actions need a second user's approval before they take effect.".to_string(),
        action: "/maker-checker".to_string(),
        back: "/dashboard".to_string(),
        groups: groups(&permissions),
    };
    Ok(template.into_response())
}

pub async fn update(user: AuthUser, Form(form): Form<Vec<(String, String)>>) -> Result<Response, PageError> {
    let current = user.client.list_permissions(true).await?;
    match user.client.update_maker_checker(&current, &desired(form)).await {
        Ok(Some(_)) => Ok(user.done("Maker-checker settings saved", "/maker-checker").await),
        Ok(None) => Ok(user.done("Nothing changed", "/maker-checker").await),
        Err(e) => failure(&user, e, "/maker-checker").await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticked_codes_are_true() {
        let desired = desired(vec![
            ("CREATE_CLIENT".to_string(), "true".to_string()),
            ("APPROVE_LOAN".to_string(), "true".to_string()),
        ]);
        assert_eq!(desired.len(), 2);
        assert_eq!(desired.get("CREATE_CLIENT"), Some(&true));
        assert_eq!(desired.get("DELETE_CLIENT"), None);
    }
}
