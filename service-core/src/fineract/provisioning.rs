//! Loan-loss provisioning criteria (`/provisioningcriteria`).
//!
//! A criteria is a set of definitions, one per provisioning category, each
//! mapping a loan age range in days to a percentage and a pair of GL
//! accounts.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::client::{CommandResult, FineractClient};
use super::error::FineractError;
use super::normalize::into_items;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningCriteria {
    pub criteria_id: i64,
    pub criteria_name: String,
    pub created_by: Option<String>,
    #[serde(default)]
    pub loan_products: Vec<LoanProductRef>,
    #[serde(default)]
    pub definitions: Vec<ProvisioningDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanProductRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningDefinition {
    pub category_id: i64,
    #[serde(default, skip_serializing)]
    pub category_name: Option<String>,
    pub min_age: i64,
    pub max_age: i64,
    pub provisioning_percentage: Decimal,
    pub liability_account: Option<i64>,
    #[serde(default, skip_serializing)]
    pub liability_account_name: Option<String>,
    pub expense_account: Option<i64>,
    #[serde(default, skip_serializing)]
    pub expense_account_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningCategory {
    pub id: i64,
    pub category_name: String,
    pub category_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlAccount {
    pub id: i64,
    pub name: String,
    pub gl_code: Option<String>,
}

/// Choices offered when building a criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaTemplate {
    #[serde(default)]
    pub definitions: Vec<ProvisioningCategory>,
    #[serde(default)]
    pub loan_products: Vec<LoanProductRef>,
    #[serde(default)]
    pub liability_accounts: Vec<GlAccount>,
    #[serde(default)]
    pub expense_accounts: Vec<GlAccount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaRequest {
    pub criteria_name: String,
    pub loan_products: Vec<LoanProductRef>,
    pub definitions: Vec<ProvisioningDefinition>,
}

impl CriteriaRequest {
    /// Check the definition table before it leaves the process.
    pub fn validate(&self) -> Result<(), FineractError> {
        if self.criteria_name.trim().is_empty() {
            return Err(invalid("Criteria name is required"));
        }
        if self.definitions.is_empty() {
            return Err(invalid("At least one provisioning category is required"));
        }

        let mut seen = HashSet::new();
        for def in &self.definitions {
            let label = def
                .category_name
                .clone()
                .unwrap_or_else(|| format!("category {}", def.category_id));
            if !seen.insert(def.category_id) {
                return Err(invalid(format!("{label} appears more than once")));
            }
            if def.min_age < 0 || def.min_age > def.max_age {
                return Err(invalid(format!(
                    "{label}: minimum age must be between 0 and the maximum age"
                )));
            }
            if def.provisioning_percentage < Decimal::ZERO
                || def.provisioning_percentage > Decimal::ONE_HUNDRED
            {
                return Err(invalid(format!(
                    "{label}: percentage must be between 0 and 100"
                )));
            }
            if def.liability_account.is_none() || def.expense_account.is_none() {
                return Err(invalid(format!(
                    "{label}: liability and expense accounts are required"
                )));
            }
        }

        let mut ranges: Vec<&ProvisioningDefinition> = self.definitions.iter().collect();
        ranges.sort_by_key(|d| d.min_age);
        for pair in ranges.windows(2) {
            if pair[1].min_age <= pair[0].max_age {
                return Err(invalid(format!(
                    "Age ranges {}-{} and {}-{} overlap",
                    pair[0].min_age, pair[0].max_age, pair[1].min_age, pair[1].max_age
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> FineractError {
    FineractError::Invalid(message.into())
}

impl FineractClient {
    pub async fn list_criteria(&self) -> Result<Vec<ProvisioningCriteria>, FineractError> {
        let value = self.get_value("provisioningcriteria", &[]).await?;
        into_items(value)
    }

    pub async fn get_criteria(&self, criteria_id: i64) -> Result<ProvisioningCriteria, FineractError> {
        self.get_json(&format!("provisioningcriteria/{criteria_id}"), &[])
            .await
    }

    pub async fn criteria_template(&self) -> Result<CriteriaTemplate, FineractError> {
        self.get_json("provisioningcriteria/template", &[]).await
    }

    pub async fn create_criteria(&self, request: &CriteriaRequest) -> Result<CommandResult, FineractError> {
        request.validate()?;
        let result: CommandResult = self
            .post_json("provisioningcriteria", &[], &with_locale(request)?)
            .await?;
        tracing::info!(
            criteria_id = ?result.resource_id,
            definitions = request.definitions.len(),
            "Provisioning criteria created"
        );
        Ok(result)
    }

    pub async fn update_criteria(
        &self,
        criteria_id: i64,
        request: &CriteriaRequest,
    ) -> Result<CommandResult, FineractError> {
        request.validate()?;
        self.put_json(
            &format!("provisioningcriteria/{criteria_id}"),
            &with_locale(request)?,
        )
        .await
    }

    pub async fn delete_criteria(&self, criteria_id: i64) -> Result<CommandResult, FineractError> {
        self.delete_json(&format!("provisioningcriteria/{criteria_id}"))
            .await
    }
}

/// Percentages are decimal strings, so Fineract needs the locale to parse them.
fn with_locale(request: &CriteriaRequest) -> Result<serde_json::Value, FineractError> {
    let mut body = serde_json::to_value(request)?;
    if let Some(map) = body.as_object_mut() {
        map.insert("locale".to_string(), super::dates::LOCALE.into());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn def(category_id: i64, min: i64, max: i64, pct: &str) -> ProvisioningDefinition {
        ProvisioningDefinition {
            category_id,
            category_name: None,
            min_age: min,
            max_age: max,
            provisioning_percentage: dec(pct),
            liability_account: Some(10),
            liability_account_name: None,
            expense_account: Some(20),
            expense_account_name: None,
        }
    }

    fn request(definitions: Vec<ProvisioningDefinition>) -> CriteriaRequest {
        CriteriaRequest {
            criteria_name: "Standard".to_string(),
            loan_products: vec![],
            definitions,
        }
    }

    #[test]
    fn accepts_contiguous_buckets() {
        let req = request(vec![def(1, 0, 30, "0"), def(2, 31, 60, "25.5"), def(3, 61, 9999, "100")]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_category() {
        let req = request(vec![def(1, 0, 30, "1"), def(1, 31, 60, "2")]);
        assert!(req.validate().unwrap_err().user_message().contains("more than once"));
    }

    #[test]
    fn rejects_overlap_regardless_of_order() {
        let req = request(vec![def(2, 25, 60, "5"), def(1, 0, 30, "1")]);
        assert!(req.validate().unwrap_err().user_message().contains("overlap"));
    }

    #[test]
    fn rejects_inverted_range_and_bad_percentage() {
        assert!(request(vec![def(1, 30, 10, "1")]).validate().is_err());
        assert!(request(vec![def(1, 0, 10, "100.01")]).validate().is_err());
        assert!(request(vec![def(1, 0, 10, "-1")]).validate().is_err());
    }

    #[test]
    fn requires_accounts() {
        let mut d = def(1, 0, 10, "1");
        d.expense_account = None;
        assert!(request(vec![d]).validate().is_err());
    }

    #[test]
    fn body_carries_locale_and_omits_display_names() {
        let mut d = def(1, 0, 30, "1");
        d.category_name = Some("STANDARD".to_string());
        let body = with_locale(&request(vec![d])).unwrap();
        assert_eq!(body["locale"], "en");
        assert!(body["definitions"][0].get("categoryName").is_none());
        assert_eq!(body["definitions"][0]["minAge"], 0);
    }
}
