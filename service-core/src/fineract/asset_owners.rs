//! External asset owner transfers: selling loans to and buying them back
//! from investors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient};
use super::dates::{Localized, fineract_date, fineract_date_opt};
use super::error::FineractError;
use super::normalize::{Page, into_page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub transfer_id: i64,
    pub transfer_external_id: Option<String>,
    pub loan: Option<TransferLoan>,
    pub owner: Option<TransferOwner>,
    #[serde(default, with = "fineract_date_opt")]
    pub settlement_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub effective_from: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub effective_to: Option<NaiveDate>,
    pub status: Option<String>,
    pub sub_status: Option<String>,
    pub purchase_price_ratio: Option<String>,
}

impl Transfer {
    pub fn loan_id(&self) -> Option<i64> {
        self.loan.as_ref().map(|l| l.loan_id)
    }

    pub fn owner_external_id(&self) -> &str {
        self.owner
            .as_ref()
            .map(|o| o.external_id.as_str())
            .unwrap_or("")
    }

    /// Only transfers that have not settled yet can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("PENDING") | Some("BUYBACK")
        ) && self.effective_to.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLoan {
    pub loan_id: i64,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwner {
    pub external_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransferSearch {
    pub text: String,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    #[serde(with = "fineract_date")]
    pub settlement_date: NaiveDate,
    pub owner_external_id: String,
    pub transfer_external_id: String,
    pub purchase_price_ratio: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuybackRequest {
    #[serde(with = "fineract_date")]
    pub settlement_date: NaiveDate,
    pub transfer_external_id: String,
}

impl SaleRequest {
    fn check(&self) -> Result<(), FineractError> {
        if self.owner_external_id.trim().is_empty() {
            return Err(FineractError::Invalid("Owner external id is required".to_string()));
        }
        match self.purchase_price_ratio.trim().parse::<f64>() {
            Ok(ratio) if ratio > 0.0 => Ok(()),
            _ => Err(FineractError::Invalid(
                "Purchase price ratio must be a positive number".to_string(),
            )),
        }
    }
}

impl FineractClient {
    pub async fn search_transfers(&self, search: &TransferSearch) -> Result<Page<Transfer>, FineractError> {
        let body = serde_json::json!({
            "request": { "text": search.text.trim() },
            "page": search.page,
            "size": search.size.max(1),
        });
        let value: serde_json::Value = self
            .post_json("external-asset-owners/search", &[], &body)
            .await?;
        into_page(value)
    }

    pub async fn loan_transfers(&self, loan_id: i64) -> Result<Page<Transfer>, FineractError> {
        let value = self
            .get_value(
                "external-asset-owners/transfers",
                &[("loanId", loan_id.to_string())],
            )
            .await?;
        into_page(value)
    }

    pub async fn sell_loan(&self, loan_id: i64, request: &SaleRequest) -> Result<CommandResult, FineractError> {
        request.check()?;
        let result = self
            .command(
                &format!("external-asset-owners/transfers/loans/{loan_id}"),
                "sale",
                &Localized::new(request),
            )
            .await?;
        tracing::info!(loan_id, owner = %request.owner_external_id, "Loan sale submitted");
        Ok(result)
    }

    pub async fn buyback_loan(
        &self,
        loan_id: i64,
        request: &BuybackRequest,
    ) -> Result<CommandResult, FineractError> {
        let result = self
            .command(
                &format!("external-asset-owners/transfers/loans/{loan_id}"),
                "buyback",
                &Localized::new(request),
            )
            .await?;
        tracing::info!(loan_id, "Loan buyback submitted");
        Ok(result)
    }

    pub async fn cancel_transfer(&self, transfer_id: i64) -> Result<CommandResult, FineractError> {
        let result = self
            .command(
                &format!("external-asset-owners/transfers/{transfer_id}"),
                "cancel",
                &serde_json::json!({}),
            )
            .await?;
        tracing::info!(transfer_id, "Transfer cancelled");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_search_page() {
        let page: Page<Transfer> = into_page(json!({
            "totalElements": 1,
            "content": [{
                "transferId": 7, "transferExternalId": "T-7",
                "loan": {"loanId": 3, "externalId": "L-3"},
                "owner": {"externalId": "INV-1"},
                "settlementDate": [2024, 3, 1],
                "effectiveFrom": [2024, 3, 1],
                "status": "PENDING",
                "purchasePriceRatio": "1.05"
            }]
        }))
        .unwrap();
        assert_eq!(page.total, 1);
        let transfer = &page.items[0];
        assert_eq!(transfer.loan_id(), Some(3));
        assert_eq!(transfer.owner_external_id(), "INV-1");
        assert!(transfer.is_cancellable());
    }

    #[test]
    fn sale_requires_positive_ratio() {
        let mut req = SaleRequest {
            settlement_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            owner_external_id: "INV-1".to_string(),
            transfer_external_id: "T-1".to_string(),
            purchase_price_ratio: "1".to_string(),
        };
        assert!(req.check().is_ok());
        req.purchase_price_ratio = "zero".to_string();
        assert!(req.check().is_err());
        req.purchase_price_ratio = "0".to_string();
        assert!(req.check().is_err());
    }

    #[test]
    fn sale_body_is_localized() {
        let req = SaleRequest {
            settlement_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            owner_external_id: "INV-1".to_string(),
            transfer_external_id: "T-1".to_string(),
            purchase_price_ratio: "1.05".to_string(),
        };
        let body = serde_json::to_value(Localized::new(&req)).unwrap();
        assert_eq!(body["settlementDate"], "01 March 2024");
        assert_eq!(body["dateFormat"], "dd MMMM yyyy");
        assert_eq!(body["ownerExternalId"], "INV-1");
    }
}
