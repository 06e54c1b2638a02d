//! Offices and staff, used mostly to populate select boxes.

use serde::{Deserialize, Serialize};

use super::client::FineractClient;
use super::error::FineractError;
use super::normalize::into_items;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub id: i64,
    pub name: String,
    pub name_decorated: Option<String>,
    pub external_id: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub display_name: String,
    pub office_id: Option<i64>,
    pub office_name: Option<String>,
    #[serde(default)]
    pub is_loan_officer: bool,
    #[serde(default)]
    pub is_active: bool,
}

impl FineractClient {
    pub async fn list_offices(&self) -> Result<Vec<Office>, FineractError> {
        let value = self.get_value("offices", &[]).await?;
        into_items(value)
    }

    pub async fn list_staff(&self, office_id: Option<i64>) -> Result<Vec<Staff>, FineractError> {
        let mut query = vec![("status", "active".to_string())];
        if let Some(office_id) = office_id {
            query.push(("officeId", office_id.to_string()));
        }
        let value = self.get_value("staff", &query).await?;
        into_items(value)
    }
}
