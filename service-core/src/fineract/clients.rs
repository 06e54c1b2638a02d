//! Clients (`/clients`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{CommandResult, EnumOption, FineractClient};
use super::dates::{Localized, fineract_date_opt, format_date};
use super::error::FineractError;
use super::normalize::{Page, into_page};

/// Person, as opposed to entity, in Fineract's legal-form code.
pub const LEGAL_FORM_PERSON: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub account_no: Option<String>,
    pub external_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub mobile_no: Option<String>,
    pub email_address: Option<String>,
    pub office_id: Option<i64>,
    pub office_name: Option<String>,
    pub staff_id: Option<i64>,
    #[serde(default)]
    pub status: EnumOption,
    #[serde(default)]
    pub active: bool,
    #[serde(default, with = "fineract_date_opt")]
    pub activation_date: Option<NaiveDate>,
}

/// Query parameters for `GET /clients`.
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    pub offset: u32,
    pub limit: u32,
    pub display_name: Option<String>,
    pub order_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ClientQuery {
    pub fn page(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.max(1).to_string()),
        ];
        if let Some(name) = self.display_name.as_deref().filter(|s| !s.trim().is_empty()) {
            query.push(("displayName", name.trim().to_string()));
        }
        if let Some(order_by) = &self.order_by {
            query.push(("orderBy", order_by.clone()));
        }
        if let Some(sort_order) = &self.sort_order {
            query.push(("sortOrder", sort_order.clone()));
        }
        query
    }
}

/// Body for `POST /clients` and `PUT /clients/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_id: Option<i64>,
    pub firstname: String,
    pub lastname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_form_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "fineract_date_opt"
    )]
    pub activation_date: Option<NaiveDate>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "fineract_date_opt"
    )]
    pub submitted_on_date: Option<NaiveDate>,
}

/// Lifecycle commands accepted by `POST /clients/{id}?command=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    Activate,
    Close,
    Reject,
    Withdraw,
    Reactivate,
}

impl ClientCommand {
    pub const ALL: [ClientCommand; 5] = [
        ClientCommand::Activate,
        ClientCommand::Close,
        ClientCommand::Reject,
        ClientCommand::Withdraw,
        ClientCommand::Reactivate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientCommand::Activate => "activate",
            ClientCommand::Close => "close",
            ClientCommand::Reject => "reject",
            ClientCommand::Withdraw => "withdraw",
            ClientCommand::Reactivate => "reactivate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }

    fn date_field(&self) -> &'static str {
        match self {
            ClientCommand::Activate => "activationDate",
            ClientCommand::Close => "closureDate",
            ClientCommand::Reject => "rejectionDate",
            ClientCommand::Withdraw => "withdrawalDate",
            ClientCommand::Reactivate => "reactivationDate",
        }
    }

    fn reason_field(&self) -> Option<&'static str> {
        match self {
            ClientCommand::Close => Some("closureReasonId"),
            ClientCommand::Reject => Some("rejectionReasonId"),
            ClientCommand::Withdraw => Some("withdrawalReasonId"),
            ClientCommand::Activate | ClientCommand::Reactivate => None,
        }
    }

    /// Command body: the command's date field plus an optional reason code.
    pub fn body(&self, date: NaiveDate, reason_id: Option<i64>) -> Localized<Map<String, Value>> {
        let mut body = Map::new();
        body.insert(self.date_field().to_string(), Value::from(format_date(date)));
        if let (Some(field), Some(reason_id)) = (self.reason_field(), reason_id) {
            body.insert(field.to_string(), Value::from(reason_id));
        }
        Localized::new(body)
    }
}

impl FineractClient {
    pub async fn list_clients(&self, query: &ClientQuery) -> Result<Page<Client>, FineractError> {
        let value = self.get_value("clients", &query.to_query()).await?;
        into_page(value)
    }

    pub async fn get_client(&self, client_id: i64) -> Result<Client, FineractError> {
        self.get_json(&format!("clients/{client_id}"), &[]).await
    }

    pub async fn create_client(&self, request: &ClientRequest) -> Result<CommandResult, FineractError> {
        let result: CommandResult = self
            .post_json("clients", &[], &Localized::new(request))
            .await?;
        tracing::info!(client_id = ?result.client_id, "Client created");
        Ok(result)
    }

    pub async fn update_client(
        &self,
        client_id: i64,
        request: &ClientRequest,
    ) -> Result<CommandResult, FineractError> {
        self.put_json(&format!("clients/{client_id}"), &Localized::new(request))
            .await
    }

    pub async fn delete_client(&self, client_id: i64) -> Result<CommandResult, FineractError> {
        let result = self.delete_json(&format!("clients/{client_id}")).await?;
        tracing::info!(client_id, "Client deleted");
        Ok(result)
    }

    pub async fn client_command(
        &self,
        client_id: i64,
        command: ClientCommand,
        date: NaiveDate,
        reason_id: Option<i64>,
    ) -> Result<CommandResult, FineractError> {
        let result = self
            .command(
                &format!("clients/{client_id}"),
                command.as_str(),
                &command.body(date, reason_id),
            )
            .await?;
        tracing::info!(client_id, command = command.as_str(), "Client command executed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_body_carries_reason() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let body = serde_json::to_value(ClientCommand::Close.body(date, Some(17))).unwrap();
        assert_eq!(body["closureDate"], "01 June 2024");
        assert_eq!(body["closureReasonId"], 17);
        assert_eq!(body["dateFormat"], "dd MMMM yyyy");
    }

    #[test]
    fn activate_ignores_reason() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let body = serde_json::to_value(ClientCommand::Activate.body(date, Some(3))).unwrap();
        assert_eq!(body["activationDate"], "01 June 2024");
        assert!(body.get("closureReasonId").is_none());
        assert_eq!(body.as_object().unwrap().len(), 3);
    }

    #[test]
    fn query_skips_blank_search() {
        let query = ClientQuery {
            display_name: Some("  ".to_string()),
            ..ClientQuery::page(20, 0)
        };
        let params = query.to_query();
        assert_eq!(params, vec![("offset", "20".to_string()), ("limit", "1".to_string())]);
    }

    #[test]
    fn parses_commands() {
        assert_eq!(ClientCommand::parse("withdraw"), Some(ClientCommand::Withdraw));
        assert_eq!(ClientCommand::parse("explode"), None);
    }
}
