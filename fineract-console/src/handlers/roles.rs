use askama::Template;
use axum::{
    extract::Path,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use service_core::fineract::roles::{Role, RoleRequest};
use validator::Validate;

use crate::forms::{FieldKind, FormErrors, FormField, FormView};
use crate::handlers::maker_checker::{desired, groups, PermissionsTemplate};
use crate::handlers::{confirm, failure, form_errors, outcome, reject, render, Layout, PageError};
use crate::models::user::AuthUser;
use crate::views::{opt, Cell, Link, Page, Row, Table};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RoleForm {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
}

impl RoleForm {
    fn from_role(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            description: role.description.clone().unwrap_or_default(),
        }
    }

    fn to_request(&self) -> RoleRequest {
        RoleRequest {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

fn form_page(title: &str, action: &str, form: &RoleForm, errors: &FormErrors) -> Page {
    let view = FormView::new(title, action)
        .field(FormField::text("name", "Name").value(&form.name).required())
        .field(
            FormField::text("description", "Description")
                .kind(FieldKind::TextArea)
                .value(&form.description)
                .required(),
        )
        .cancel("/roles")
        .with_errors(errors);
    Page::new("roles", title).form(view)
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let roles = user.client.list_roles().await?;
    let table = Table::new(&["Name", "Description", "Status"])
        .empty("No roles")
        .rows(roles.iter().map(|r| {
            let toggle = if r.disabled {
                Link::post("Enable", format!("/roles/{}/enable", r.id))
            } else {
                Link::post("Disable", format!("/roles/{}/disable", r.id))
            };
            Row::new(vec![
                Cell::link(r.name.clone(), format!("/roles/{}/permissions", r.id)),
                opt(r.description.as_deref()).into(),
                Cell::from(if r.disabled { "Disabled" } else { "Enabled" }),
            ])
            .action(Link::get("Permissions", format!("/roles/{}/permissions", r.id)))
            .action(Link::get("Edit", format!("/roles/{}/edit", r.id)))
            .action(toggle)
            .action(Link::get("Delete", format!("/roles/{}/delete", r.id)).danger())
        }));
    let page = Page::new("roles", "Roles")
        .action(Link::get("New role", "/roles/new"))
        .table(table);
    Ok(render(&user, page).await)
}

pub async fn new(user: AuthUser) -> Response {
    render(&user, form_page("New role", "/roles", &RoleForm::default(), &FormErrors::default())).await
}

pub async fn create(user: AuthUser, Form(form): Form<RoleForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_role(&form.to_request()).await {
            Ok(result) => {
                let to = result
                    .resource_id
                    .map(|id| format!("/roles/{id}/permissions"))
                    .unwrap_or_else(|| "/roles".to_string());
                return Ok(user.done("Role created", &to).await);
            }
            Err(e) => form_errors(e)?,
        },
    };
    Ok(reject(&user, &errors, form_page("New role", "/roles", &form, &errors)).await)
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let role = user.client.get_role(id).await?;
    let page = form_page("Edit role", &format!("/roles/{id}"), &RoleForm::from_role(&role), &FormErrors::default());
    Ok(render(&user, page).await)
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<RoleForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_role(id, &form.to_request()).await {
            Ok(_) => return Ok(user.done("Role updated", "/roles").await),
            Err(e) => form_errors(e)?,
        },
    };
    let page = form_page("Edit role", &format!("/roles/{id}"), &form, &errors);
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let role = user.client.get_role(id).await?;
    Ok(confirm(
        &user,
        "roles",
        "Delete role",
        format!("Delete role {}? Roles assigned to users cannot be deleted.", role.name),
        &format!("/roles/{id}/delete"),
        "/roles",
    )
    .await)
}

pub async fn delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.delete_role(id).await;
    outcome(&user, result, "Role deleted", "/roles").await
}

pub async fn enable(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.set_role_enabled(id, true).await;
    outcome(&user, result, "Role enabled", "/roles").await
}

pub async fn disable(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let result = user.client.set_role_enabled(id, false).await;
    outcome(&user, result, "Role disabled", "/roles").await
}

pub async fn permissions(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let role = user.client.role_permissions(id).await?;
    let template = PermissionsTemplate {
        layout: Layout::new(&user, "roles").await,
        title: format!("Permissions for {}", role.name),
        intro: role.description.clone().unwrap_or_default(),
        action: format!("/roles/{id}/permissions"),
        back: "/roles".to_string(),
        groups: groups(&role.permission_usage_data),
    };
    Ok(template.into_response())
}

pub async fn update_permissions(
    user: AuthUser,
    Path(id): Path<i64>,
    Form(form): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let back = format!("/roles/{id}/permissions");
    let role = user.client.role_permissions(id).await?;
    match user
        .client
        .update_role_permissions(id, &role.permission_usage_data, &desired(form))
        .await
    {
        Ok(Some(_)) => Ok(user.done(format!("Permissions for {} saved", role.name), &back).await),
        Ok(None) => Ok(user.done("Nothing changed", &back).await),
        Err(e) => failure(&user, e, &back).await,
    }
}
