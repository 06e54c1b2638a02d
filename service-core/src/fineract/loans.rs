//! Loans (`/loans`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{CommandResult, EnumOption, FineractClient};
use super::dates::{Localized, fineract_date, fineract_date_opt, format_date};
use super::error::FineractError;
use super::normalize::{Page, into_page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    pub id: i64,
    pub account_no: Option<String>,
    pub external_id: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub loan_product_name: Option<String>,
    pub principal: Option<Decimal>,
    #[serde(default)]
    pub status: EnumOption,
    pub summary: Option<LoanBalance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBalance {
    pub total_outstanding: Option<Decimal>,
    pub total_repayment: Option<Decimal>,
    pub total_overdue: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTimeline {
    #[serde(default, with = "fineract_date_opt")]
    pub submitted_on_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub approved_on_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub expected_disbursement_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub actual_disbursement_date: Option<NaiveDate>,
    #[serde(default, with = "fineract_date_opt")]
    pub closed_on_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePeriod {
    pub period: Option<i64>,
    #[serde(with = "fineract_date")]
    pub due_date: NaiveDate,
    pub principal_due: Option<Decimal>,
    pub interest_due: Option<Decimal>,
    pub fee_charges_due: Option<Decimal>,
    pub total_due_for_period: Option<Decimal>,
    pub total_paid_for_period: Option<Decimal>,
    pub total_outstanding_for_period: Option<Decimal>,
    #[serde(default)]
    pub complete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepaymentSchedule {
    #[serde(default)]
    pub periods: Vec<SchedulePeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTransaction {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: EnumOption,
    #[serde(with = "fineract_date")]
    pub date: NaiveDate,
    pub amount: Decimal,
    pub outstanding_loan_balance: Option<Decimal>,
    #[serde(default)]
    pub manually_reversed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Currency {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: i64,
    pub account_no: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub loan_product_name: Option<String>,
    pub principal: Option<Decimal>,
    pub approved_principal: Option<Decimal>,
    #[serde(default)]
    pub status: EnumOption,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub timeline: LoanTimeline,
    pub summary: Option<LoanBalance>,
    #[serde(default)]
    pub repayment_schedule: RepaymentSchedule,
    #[serde(default)]
    pub transactions: Vec<LoanTransaction>,
}

#[derive(Debug, Clone, Default)]
pub struct LoanQuery {
    pub offset: u32,
    pub limit: u32,
    pub account_no: Option<String>,
    pub external_id: Option<String>,
}

impl LoanQuery {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.max(1).to_string()),
        ];
        if let Some(account_no) = self.account_no.as_deref().filter(|s| !s.is_empty()) {
            query.push(("accountNo", account_no.to_string()));
        }
        if let Some(external_id) = self.external_id.as_deref().filter(|s| !s.is_empty()) {
            query.push(("externalId", external_id.to_string()));
        }
        query
    }
}

/// State transitions accepted by `POST /loans/{id}?command=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanCommand {
    Approve,
    UndoApproval,
    Reject,
    WithdrawnByApplicant,
    Disburse,
    UndoDisbursal,
}

impl LoanCommand {
    pub const ALL: [LoanCommand; 6] = [
        LoanCommand::Approve,
        LoanCommand::UndoApproval,
        LoanCommand::Reject,
        LoanCommand::WithdrawnByApplicant,
        LoanCommand::Disburse,
        LoanCommand::UndoDisbursal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanCommand::Approve => "approve",
            LoanCommand::UndoApproval => "undoApproval",
            LoanCommand::Reject => "reject",
            LoanCommand::WithdrawnByApplicant => "withdrawnByApplicant",
            LoanCommand::Disburse => "disburse",
            LoanCommand::UndoDisbursal => "undoDisbursal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanCommand::Approve => "Approve",
            LoanCommand::UndoApproval => "Undo approval",
            LoanCommand::Reject => "Reject",
            LoanCommand::WithdrawnByApplicant => "Withdrawn by applicant",
            LoanCommand::Disburse => "Disburse",
            LoanCommand::UndoDisbursal => "Undo disbursal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }

    /// Undo commands take only a note.
    pub fn needs_date(&self) -> bool {
        !matches!(self, LoanCommand::UndoApproval | LoanCommand::UndoDisbursal)
    }

    fn date_field(&self) -> Option<&'static str> {
        match self {
            LoanCommand::Approve => Some("approvedOnDate"),
            LoanCommand::Reject => Some("rejectedOnDate"),
            LoanCommand::WithdrawnByApplicant => Some("withdrawnOnDate"),
            LoanCommand::Disburse => Some("actualDisbursementDate"),
            LoanCommand::UndoApproval | LoanCommand::UndoDisbursal => None,
        }
    }

    fn amount_field(&self) -> Option<&'static str> {
        match self {
            LoanCommand::Approve => Some("approvedLoanAmount"),
            LoanCommand::Disburse => Some("transactionAmount"),
            _ => None,
        }
    }

    pub fn body(&self, request: &LoanCommandRequest) -> Result<Localized<Map<String, Value>>, FineractError> {
        let mut body = Map::new();
        if let Some(field) = self.date_field() {
            let date = request.date.ok_or_else(|| {
                FineractError::Invalid(format!("{} requires a date", self.label()))
            })?;
            body.insert(field.to_string(), Value::from(format_date(date)));
        }
        if let (Some(field), Some(amount)) = (self.amount_field(), request.amount) {
            body.insert(field.to_string(), Value::from(amount.to_string()));
        }
        if let Some(note) = request.note.as_deref().filter(|n| !n.trim().is_empty()) {
            body.insert("note".to_string(), Value::from(note.trim()));
        }
        Ok(Localized::new(body))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoanCommandRequest {
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentRequest {
    #[serde(with = "fineract_date")]
    pub transaction_date: NaiveDate,
    pub transaction_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FineractClient {
    pub async fn list_loans(&self, query: &LoanQuery) -> Result<Page<LoanSummary>, FineractError> {
        let value = self.get_value("loans", &query.to_query()).await?;
        into_page(value)
    }

    pub async fn get_loan(&self, loan_id: i64) -> Result<Loan, FineractError> {
        self.get_json(
            &format!("loans/{loan_id}"),
            &[("associations", "repaymentSchedule,transactions".to_string())],
        )
        .await
    }

    pub async fn loan_command(
        &self,
        loan_id: i64,
        command: LoanCommand,
        request: &LoanCommandRequest,
    ) -> Result<CommandResult, FineractError> {
        let body = command.body(request)?;
        let result = self
            .command(&format!("loans/{loan_id}"), command.as_str(), &body)
            .await?;
        tracing::info!(loan_id, command = command.as_str(), "Loan command executed");
        Ok(result)
    }

    pub async fn make_repayment(
        &self,
        loan_id: i64,
        request: &RepaymentRequest,
    ) -> Result<CommandResult, FineractError> {
        if request.transaction_amount <= Decimal::ZERO {
            return Err(FineractError::Invalid(
                "Repayment amount must be greater than zero".to_string(),
            ));
        }
        let result = self
            .command(
                &format!("loans/{loan_id}/transactions"),
                "repayment",
                &Localized::new(request),
            )
            .await?;
        tracing::info!(loan_id, amount = %request.transaction_amount, "Loan repayment posted");
        Ok(result)
    }
}
