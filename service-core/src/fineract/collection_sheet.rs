//! Individual collection sheets: the per-office worksheet of loan
//! repayments and savings deposits due on a date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::client::{CommandResult, EnumOption, FineractClient};
use super::dates::{Localized, fineract_date, fineract_date_opt};
use super::error::FineractError;

/// Fineract's code for an ordinary savings deposit account.
pub const DEPOSIT_ACCOUNT_SAVINGS: i64 = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRequest {
    pub office_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    #[serde(with = "fineract_date")]
    pub transaction_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSheet {
    #[serde(default, with = "fineract_date_opt")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub clients: Vec<SheetClient>,
    #[serde(default)]
    pub payment_type_options: Vec<EnumOption>,
}

impl CollectionSheet {
    pub fn total_loan_due(&self) -> Decimal {
        self.clients
            .iter()
            .flat_map(|c| c.loans.iter())
            .map(|l| l.total_due)
            .sum()
    }

    pub fn total_savings_due(&self) -> Decimal {
        self.clients
            .iter()
            .flat_map(|c| c.savings.iter())
            .map(|s| s.due_amount)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetClient {
    pub client_id: i64,
    pub client_name: String,
    #[serde(default)]
    pub loans: Vec<SheetLoan>,
    #[serde(default)]
    pub savings: Vec<SheetSavings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLoan {
    pub loan_id: i64,
    pub account_id: Option<String>,
    pub product_short_name: Option<String>,
    #[serde(default)]
    pub total_due: Decimal,
    #[serde(default)]
    pub charges_due: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSavings {
    pub savings_id: i64,
    pub account_id: Option<String>,
    pub product_name: Option<String>,
    #[serde(default)]
    pub due_amount: Decimal,
    #[serde(default = "default_deposit_type", deserialize_with = "deposit_type")]
    pub deposit_account_type: i64,
}

fn default_deposit_type() -> i64 {
    DEPOSIT_ACCOUNT_SAVINGS
}

/// Accepts either the bare code or an enum object `{ "id": 100, ... }`.
fn deposit_type<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_i64(),
        Value::Object(map) => map.get("id").and_then(Value::as_i64),
        _ => None,
    }
    .unwrap_or(DEPOSIT_ACCOUNT_SAVINGS))
}

/// An amount entered against one account on the sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetEntry {
    Loan { loan_id: i64, amount: Decimal },
    Savings { savings_id: i64, deposit_account_type: i64, amount: Decimal },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkRepayment {
    loan_id: i64,
    transaction_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSavingsDue {
    savings_id: i64,
    transaction_amount: Decimal,
    deposit_account_type: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSheetRequest {
    #[serde(with = "fineract_date")]
    pub transaction_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type_id: Option<i64>,
    bulk_repayment_transactions: Vec<BulkRepayment>,
    bulk_savings_due_transactions: Vec<BulkSavingsDue>,
}

impl SaveSheetRequest {
    /// Keep only positive amounts and split them by account kind.
    pub fn new(transaction_date: NaiveDate, payment_type_id: Option<i64>, entries: &[SheetEntry]) -> Self {
        let mut bulk_repayment_transactions = Vec::new();
        let mut bulk_savings_due_transactions = Vec::new();
        for entry in entries {
            match *entry {
                SheetEntry::Loan { loan_id, amount } if amount > Decimal::ZERO => {
                    bulk_repayment_transactions.push(BulkRepayment {
                        loan_id,
                        transaction_amount: amount,
                    });
                }
                SheetEntry::Savings {
                    savings_id,
                    deposit_account_type,
                    amount,
                } if amount > Decimal::ZERO => {
                    bulk_savings_due_transactions.push(BulkSavingsDue {
                        savings_id,
                        transaction_amount: amount,
                        deposit_account_type,
                    });
                }
                _ => {}
            }
        }
        Self {
            transaction_date,
            payment_type_id,
            bulk_repayment_transactions,
            bulk_savings_due_transactions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bulk_repayment_transactions.is_empty() && self.bulk_savings_due_transactions.is_empty()
    }

    pub fn transaction_count(&self) -> usize {
        self.bulk_repayment_transactions.len() + self.bulk_savings_due_transactions.len()
    }
}

impl FineractClient {
    pub async fn generate_collection_sheet(&self, request: &SheetRequest) -> Result<CollectionSheet, FineractError> {
        self.command("collectionsheet", "generateCollectionSheet", &Localized::new(request))
            .await
    }

    pub async fn save_collection_sheet(&self, request: &SaveSheetRequest) -> Result<CommandResult, FineractError> {
        if request.is_empty() {
            return Err(FineractError::Invalid(
                "Enter at least one amount greater than zero".to_string(),
            ));
        }
        let result = self
            .command("collectionsheet", "saveCollectionSheet", &Localized::new(request))
            .await?;
        tracing::info!(
            date = %request.transaction_date,
            loans = request.bulk_repayment_transactions.len(),
            savings = request.bulk_savings_due_transactions.len(),
            "Collection sheet saved"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn save_keeps_positive_amounts_and_splits_kinds() {
        let entries = vec![
            SheetEntry::Loan { loan_id: 1, amount: Decimal::new(2500, 2) },
            SheetEntry::Loan { loan_id: 2, amount: Decimal::ZERO },
            SheetEntry::Savings { savings_id: 9, deposit_account_type: 100, amount: Decimal::new(10, 0) },
            SheetEntry::Savings { savings_id: 10, deposit_account_type: 100, amount: Decimal::new(-5, 0) },
        ];
        let request = SaveSheetRequest::new(date(), None, &entries);
        assert_eq!(request.transaction_count(), 2);

        let body = serde_json::to_value(Localized::new(&request)).unwrap();
        assert_eq!(body["transactionDate"], "03 June 2024");
        assert_eq!(body["bulkRepaymentTransactions"], json!([{"loanId": 1, "transactionAmount": "25.00"}]));
        assert_eq!(
            body["bulkSavingsDueTransactions"],
            json!([{"savingsId": 9, "transactionAmount": "10", "depositAccountType": 100}])
        );
        assert_eq!(body["locale"], "en");
        assert!(body.get("paymentTypeId").is_none());
    }

    #[test]
    fn empty_save_is_detected() {
        let request = SaveSheetRequest::new(date(), None, &[SheetEntry::Loan { loan_id: 1, amount: Decimal::ZERO }]);
        assert!(request.is_empty());
    }

    #[test]
    fn decodes_generated_sheet() {
        let sheet: CollectionSheet = serde_json::from_value(json!({
            "dueDate": [2024, 6, 3],
            "clients": [{
                "clientId": 5, "clientName": "Ada Obi",
                "loans": [{"loanId": 1, "accountId": "000000001", "productShortName": "PL", "totalDue": 120.5, "chargesDue": 0}],
                "savings": [{"savingsId": 9, "accountId": "000000009", "productName": "Passbook", "dueAmount": 10,
                             "depositAccountType": {"id": 100, "code": "depositAccountType.savingsDeposit", "value": "Savings"}}]
            }],
            "paymentTypeOptions": [{"id": 1, "name": "Cash"}]
        }))
        .unwrap();
        assert_eq!(sheet.total_loan_due(), Decimal::new(1205, 1));
        assert_eq!(sheet.total_savings_due(), Decimal::new(10, 0));
        assert_eq!(sheet.clients[0].savings[0].deposit_account_type, 100);
    }
}
