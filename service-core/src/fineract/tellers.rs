//! Tellers, their cashiers, and cash allocation (`/tellers`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient};
use super::dates::{Localized, fineract_date, fineract_date_opt};
use super::error::FineractError;
use super::normalize::into_items;

/// Fineract's teller status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TellerStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "INACTIVE")]
    Inactive,
}

impl TellerStatus {
    /// Numeric code expected on writes.
    pub fn code(&self) -> i64 {
        match self {
            TellerStatus::Active => 300,
            TellerStatus::Inactive => 400,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            300 => Some(TellerStatus::Active),
            400 => Some(TellerStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teller {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub office_id: Option<i64>,
    pub office_name: Option<String>,
    pub status: Option<TellerStatus>,
    #[serde(default, with = "fineract_date_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TellerRequest {
    pub office_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "fineract_date")]
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", with = "fineract_date_opt")]
    pub end_date: Option<NaiveDate>,
    pub status: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashier {
    pub id: i64,
    pub teller_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub staff_name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "fineract_date_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_full_day: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierRequest {
    pub staff_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "fineract_date")]
    pub start_date: NaiveDate,
    #[serde(with = "fineract_date")]
    pub end_date: NaiveDate,
    pub is_full_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_end_time: Option<String>,
}

/// Body for cash allocation and settlement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashTransaction {
    #[serde(with = "fineract_date")]
    pub txn_date: NaiveDate,
    pub txn_amount: Decimal,
    pub currency_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_note: Option<String>,
}

/// Direction of cash movement between a teller vault and a cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashMovement {
    Allocate,
    Settle,
}

impl CashMovement {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashMovement::Allocate => "allocate",
            CashMovement::Settle => "settle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "allocate" => Some(CashMovement::Allocate),
            "settle" => Some(CashMovement::Settle),
            _ => None,
        }
    }
}

impl FineractClient {
    pub async fn list_tellers(&self) -> Result<Vec<Teller>, FineractError> {
        let value = self.get_value("tellers", &[]).await?;
        into_items(value)
    }

    pub async fn get_teller(&self, teller_id: i64) -> Result<Teller, FineractError> {
        self.get_json(&format!("tellers/{teller_id}"), &[]).await
    }

    pub async fn create_teller(&self, request: &TellerRequest) -> Result<CommandResult, FineractError> {
        validate_period(request.start_date, request.end_date)?;
        let result: CommandResult = self
            .post_json("tellers", &[], &Localized::new(request))
            .await?;
        tracing::info!(teller_id = ?result.resource_id, name = %request.name, "Teller created");
        Ok(result)
    }

    pub async fn update_teller(
        &self,
        teller_id: i64,
        request: &TellerRequest,
    ) -> Result<CommandResult, FineractError> {
        validate_period(request.start_date, request.end_date)?;
        self.put_json(&format!("tellers/{teller_id}"), &Localized::new(request))
            .await
    }

    pub async fn delete_teller(&self, teller_id: i64) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("tellers/{teller_id}")).await
    }

    pub async fn list_cashiers(&self, teller_id: i64) -> Result<Vec<Cashier>, FineractError> {
        let value = self
            .get_value(&format!("tellers/{teller_id}/cashiers"), &[])
            .await?;
        into_items(value)
    }

    pub async fn create_cashier(
        &self,
        teller_id: i64,
        request: &CashierRequest,
    ) -> Result<CommandResult, FineractError> {
        validate_period(request.start_date, Some(request.end_date))?;
        self.post_json(
            &format!("tellers/{teller_id}/cashiers"),
            &[],
            &Localized::new(request),
        )
        .await
    }

    pub async fn delete_cashier(
        &self,
        teller_id: i64,
        cashier_id: i64,
    ) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("tellers/{teller_id}/cashiers/{cashier_id}"))
            .await
    }

    /// Move cash to (`allocate`) or from (`settle`) a cashier.
    pub async fn move_cash(
        &self,
        teller_id: i64,
        cashier_id: i64,
        movement: CashMovement,
        transaction: &CashTransaction,
    ) -> Result<CommandResult, FineractError> {
        if transaction.txn_amount <= Decimal::ZERO {
            return Err(FineractError::Invalid(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let result = self
            .post_json(
                &format!(
                    "tellers/{teller_id}/cashiers/{cashier_id}/{}",
                    movement.as_str()
                ),
                &[],
                &Localized::new(transaction),
            )
            .await?;
        tracing::info!(
            teller_id,
            cashier_id,
            movement = movement.as_str(),
            amount = %transaction.txn_amount,
            "Cashier cash movement recorded"
        );
        Ok(result)
    }

    pub async fn allocate_cash(
        &self,
        teller_id: i64,
        cashier_id: i64,
        transaction: &CashTransaction,
    ) -> Result<CommandResult, FineractError> {
        self.move_cash(teller_id, cashier_id, CashMovement::Allocate, transaction)
            .await
    }

    pub async fn settle_cash(
        &self,
        teller_id: i64,
        cashier_id: i64,
        transaction: &CashTransaction,
    ) -> Result<CommandResult, FineractError> {
        self.move_cash(teller_id, cashier_id, CashMovement::Settle, transaction)
            .await
    }
}

fn validate_period(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), FineractError> {
    match end {
        Some(end) if end < start => Err(FineractError::Invalid(
            "End date must not be before start date".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn teller_status_round_trips_codes() {
        assert_eq!(TellerStatus::from_code(300), Some(TellerStatus::Active));
        assert_eq!(TellerStatus::Inactive.code(), 400);
        assert_eq!(TellerStatus::from_code(1), None);
    }

    #[test]
    fn decodes_teller_listing() {
        let tellers: Vec<Teller> = into_items(json!([
            {"id": 1, "name": "Front desk", "officeId": 1, "officeName": "Head Office",
             "status": "ACTIVE", "startDate": [2023, 1, 1]}
        ]))
        .unwrap();
        assert_eq!(tellers[0].status, Some(TellerStatus::Active));
        assert_eq!(tellers[0].start_date, NaiveDate::from_ymd_opt(2023, 1, 1));
    }

    #[test]
    fn rejects_inverted_period() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(validate_period(start, Some(end)).is_err());
        assert!(validate_period(start, None).is_ok());
        assert!(validate_period(end, Some(start)).is_ok());
    }
}
