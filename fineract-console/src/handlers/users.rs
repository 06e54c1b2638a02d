use axum::{extract::Path, response::Response};
use axum_extra::extract::Form;
use serde::Deserialize;
use service_core::fineract::users::{AppUser, UserRequest};
use validator::{Validate, ValidationError};

use crate::forms::validators::validate_id;
use crate::forms::{
    blank_as_none, checkbox, parse_id, parse_optional_id, FieldKind, FormErrors, FormField,
    FormView,
};
use crate::handlers::{confirm, failure, form_errors, reject, render, PageError};
use crate::models::user::AuthUser;
use crate::views::{opt, optional, options, yes_no, Cell, Facts, Link, Page, Row, Table};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "passwords_match"))]
pub struct UserForm {
    #[validate(length(min = 1, max = 100, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub firstname: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub lastname: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_id"))]
    pub office_id: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_id"))]
    pub staff_id: Option<String>,
    #[validate(length(min = 1, message = "Select at least one role"))]
    pub roles: Vec<String>,
    #[serde(deserialize_with = "checkbox")]
    pub send_password_to_email: bool,
    #[serde(deserialize_with = "blank_as_none")]
    pub password: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub repeat_password: Option<String>,
    #[serde(deserialize_with = "checkbox")]
    pub password_never_expires: bool,
}

fn passwords_match(form: &UserForm) -> Result<(), ValidationError> {
    if form.password != form.repeat_password {
        let mut err = ValidationError::new("password");
        err.message = Some("Passwords do not match".into());
        return Err(err);
    }
    Ok(())
}

impl UserForm {
    fn from_user(user: &AppUser) -> Self {
        Self {
            username: user.username.clone(),
            firstname: user.firstname.clone().unwrap_or_default(),
            lastname: user.lastname.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
            office_id: opt(user.office_id),
            staff_id: user.staff.as_ref().map(|s| s.id.to_string()),
            roles: user.roles.iter().map(|r| r.id.to_string()).collect(),
            password_never_expires: user.password_never_expires,
            ..Self::default()
        }
    }

    fn to_request(&self) -> Result<UserRequest, PageError> {
        let roles = self
            .roles
            .iter()
            .map(|r| parse_id("Role", r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UserRequest {
            username: self.username.trim().to_string(),
            firstname: self.firstname.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            email: self.email.trim().to_string(),
            office_id: parse_id("Office", &self.office_id)?,
            staff_id: parse_optional_id("Staff", self.staff_id.as_deref())?,
            roles,
            send_password_to_email: self.send_password_to_email,
            password: self.password.clone(),
            repeat_password: self.repeat_password.clone(),
            password_never_expires: self.password_never_expires,
        })
    }
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let users = user.client.list_users().await?;
    let table = Table::new(&["Username", "Name", "Email", "Office", "Roles"])
        .empty("No users")
        .rows(users.iter().map(|u| {
            Row::new(vec![
                Cell::link(u.username.clone(), format!("/users/{}", u.id)),
                u.full_name().into(),
                opt(u.email.as_deref()).into(),
                opt(u.office_name.as_deref()).into(),
                u.role_names().into(),
            ])
            .action(Link::get("Edit", format!("/users/{}/edit", u.id)))
        }));
    let page = Page::new("users", "Users")
        .action(Link::get("New user", "/users/new"))
        .table(table);
    Ok(render(&user, page).await)
}

async fn form_page(
    user: &AuthUser,
    title: &str,
    action: &str,
    form: &UserForm,
    errors: &FormErrors,
    creating: bool,
) -> Result<Page, PageError> {
    let (offices, staff, roles) = tokio::join!(
        user.client.list_offices(),
        user.client.list_staff(None),
        user.client.list_roles()
    );
    let offices = options(offices?, |o| (o.id, o.name));
    let staff = optional(options(staff?, |s| (s.id, s.display_name)));
    let roles = options(roles?.into_iter().filter(|r| !r.disabled), |r| (r.id, r.name));

    let mut view = FormView::new(title, action)
        .field(FormField::text("username", "Username").value(&form.username).required())
        .field(FormField::text("firstname", "First name").value(&form.firstname).required())
        .field(FormField::text("lastname", "Last name").value(&form.lastname).required())
        .field(FormField::text("email", "Email").kind(FieldKind::Email).value(&form.email).required())
        .field(FormField::select("officeId", "Office", offices, &form.office_id).required())
        .field(FormField::select("staffId", "Staff", staff, form.staff_id.as_deref().unwrap_or("")))
        .field(FormField::multi_select("roles", "Roles", roles, &form.roles).required());
    if creating {
        view = view.field(FormField::checkbox(
            "sendPasswordToEmail",
            "Email a generated password",
            form.send_password_to_email,
        ));
    }
    let password_help = if creating {
        "Leave blank when emailing a generated password"
    } else {
        "Leave blank to keep the current password"
    };
    let view = view
        .field(FormField::text("password", "Password").kind(FieldKind::Password).help(password_help))
        .field(FormField::text("repeatPassword", "Repeat password").kind(FieldKind::Password))
        .field(FormField::checkbox("passwordNeverExpires", "Password never expires", form.password_never_expires))
        .cancel("/users")
        .with_errors(errors);
    Ok(Page::new("users", title).form(view))
}

pub async fn new(user: AuthUser) -> Result<Response, PageError> {
    let form = UserForm {
        send_password_to_email: true,
        ..UserForm::default()
    };
    let page = form_page(&user, "New user", "/users", &form, &FormErrors::default(), true).await?;
    Ok(render(&user, page).await)
}

pub async fn create(user: AuthUser, Form(form): Form<UserForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_user(&form.to_request()?).await {
            Ok(result) => {
                let to = result
                    .resource_id
                    .map(|id| format!("/users/{id}"))
                    .unwrap_or_else(|| "/users".to_string());
                return Ok(user.done(format!("User {} created", form.username.trim()), &to).await);
            }
            Err(e) => form_errors(e)?,
        },
    };
    let page = form_page(&user, "New user", "/users", &form, &errors, true).await?;
    Ok(reject(&user, &errors, page).await)
}

pub async fn show(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let app_user = user.client.get_user(id).await?;
    let facts = Facts::new()
        .item("Name", app_user.full_name())
        .item("Email", opt(app_user.email.as_deref()))
        .item("Office", opt(app_user.office_name.as_deref()))
        .item(
            "Staff",
            app_user
                .staff
                .as_ref()
                .and_then(|s| s.display_name.clone())
                .unwrap_or_default(),
        )
        .item("Roles", app_user.role_names())
        .item("Password never expires", yes_no(app_user.password_never_expires));
    let page = Page::new("users", app_user.username.clone())
        .action(Link::get("Edit", format!("/users/{id}/edit")))
        .action(Link::get("Delete", format!("/users/{id}/delete")).danger())
        .facts(facts);
    Ok(render(&user, page).await)
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let app_user = user.client.get_user(id).await?;
    let form = UserForm::from_user(&app_user);
    let page = form_page(&user, "Edit user", &format!("/users/{id}"), &form, &FormErrors::default(), false).await?;
    Ok(render(&user, page).await)
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<UserForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_user(id, &form.to_request()?).await {
            Ok(_) => return Ok(user.done("User updated", &format!("/users/{id}")).await),
            Err(e) => form_errors(e)?,
        },
    };
    let page = form_page(&user, "Edit user", &format!("/users/{id}"), &form, &errors, false).await?;
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let app_user = user.client.get_user(id).await?;
    Ok(confirm(
        &user,
        "users",
        "Delete user",
        format!("Delete user {}?", app_user.username),
        &format!("/users/{id}/delete"),
        &format!("/users/{id}"),
    )
    .await)
}

pub async fn delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    if id == user.user_id {
        return Ok(user.failed("You cannot delete your own user", &format!("/users/{id}")).await);
    }
    match user.client.delete_user(id).await {
        Ok(_) => Ok(user.done("User deleted", "/users").await),
        Err(e) => failure(&user, e, &format!("/users/{id}")).await,
    }
}
