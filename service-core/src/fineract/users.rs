//! Application users (`/users`).

use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient, RoleRef};
use super::error::FineractError;
use super::normalize::into_items;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    pub id: i64,
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub office_id: Option<i64>,
    pub office_name: Option<String>,
    pub staff: Option<StaffRef>,
    #[serde(default, alias = "selectedRoles")]
    pub roles: Vec<RoleRef>,
    #[serde(default)]
    pub password_never_expires: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRef {
    pub id: i64,
    pub display_name: Option<String>,
}

impl AppUser {
    pub fn full_name(&self) -> String {
        [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn role_names(&self) -> String {
        self.roles
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Body for `POST /users` and `PUT /users/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub office_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    pub roles: Vec<i64>,
    pub send_password_to_email: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_password: Option<String>,
    pub password_never_expires: bool,
}

impl UserRequest {
    fn check(&self) -> Result<(), FineractError> {
        if self.roles.is_empty() {
            return Err(FineractError::Invalid("Select at least one role".to_string()));
        }
        if !self.send_password_to_email && self.password.is_none() {
            return Err(FineractError::Invalid(
                "Provide a password or have it emailed to the user".to_string(),
            ));
        }
        if self.password != self.repeat_password {
            return Err(FineractError::Invalid("Passwords do not match".to_string()));
        }
        Ok(())
    }
}

impl FineractClient {
    pub async fn list_users(&self) -> Result<Vec<AppUser>, FineractError> {
        let value = self.get_value("users", &[]).await?;
        into_items(value)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<AppUser, FineractError> {
        self.get_json(&format!("users/{user_id}"), &[]).await
    }

    pub async fn create_user(&self, request: &UserRequest) -> Result<CommandResult, FineractError> {
        request.check()?;
        let result: CommandResult = self.post_json("users", &[], request).await?;
        tracing::info!(user_id = ?result.resource_id, username = %request.username, "User created");
        Ok(result)
    }

    /// Updates never resend the password unless one was entered.
    pub async fn update_user(
        &self,
        user_id: i64,
        request: &UserRequest,
    ) -> Result<CommandResult, FineractError> {
        if request.roles.is_empty() {
            return Err(FineractError::Invalid("Select at least one role".to_string()));
        }
        if request.password != request.repeat_password {
            return Err(FineractError::Invalid("Passwords do not match".to_string()));
        }
        let mut body = serde_json::to_value(request)?;
        if let Some(map) = body.as_object_mut() {
            map.remove("sendPasswordToEmail");
        }
        self.put_json(&format!("users/{user_id}"), &body).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<CommandResult, FineractError> {
        let result = self.delete_json(&format!("users/{user_id}")).await?;
        tracing::info!(user_id, "User deleted");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UserRequest {
        UserRequest {
            username: "teller1".to_string(),
            firstname: "Ada".to_string(),
            lastname: "Obi".to_string(),
            email: "ada@example.com".to_string(),
            office_id: 1,
            staff_id: None,
            roles: vec![2],
            send_password_to_email: true,
            password: None,
            repeat_password: None,
            password_never_expires: false,
        }
    }

    #[test]
    fn accepts_emailed_password() {
        assert!(request().check().is_ok());
    }

    #[test]
    fn requires_roles() {
        let req = UserRequest {
            roles: vec![],
            ..request()
        };
        assert_eq!(req.check().unwrap_err().user_message(), "Select at least one role");
    }

    #[test]
    fn requires_matching_passwords() {
        let req = UserRequest {
            send_password_to_email: false,
            password: Some("secret-1".to_string()),
            repeat_password: Some("secret-2".to_string()),
            ..request()
        };
        assert_eq!(req.check().unwrap_err().user_message(), "Passwords do not match");
    }

    #[test]
    fn joins_names() {
        let user: AppUser = serde_json::from_value(serde_json::json!({
            "id": 1, "username": "mifos", "firstname": "App", "lastname": "Administrator",
            "selectedRoles": [{"id": 1, "name": "Super user"}]
        }))
        .unwrap();
        assert_eq!(user.full_name(), "App Administrator");
        assert_eq!(user.role_names(), "Super user");
    }
}
