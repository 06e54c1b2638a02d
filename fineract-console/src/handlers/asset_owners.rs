use axum::{
    extract::{Path, Query},
    response::{Redirect, Response},
    Form,
};
use serde::Deserialize;
use service_core::fineract::asset_owners::{BuybackRequest, SaleRequest, Transfer, TransferSearch};
use validator::Validate;

use crate::forms::validators::validate_date;
use crate::forms::{parse_date, FormErrors, FormField, FormView};
use crate::handlers::{failure, form_errors, outcome, render, PageError, PAGE_SIZE};
use crate::models::user::AuthUser;
use crate::views::{date, opt, Cell, Facts, Link, Page, Pager, Row, Table};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransferQuery {
    pub text: String,
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SaleForm {
    #[validate(custom(function = "validate_date"))]
    pub settlement_date: String,
    #[validate(length(min = 1, max = 100, message = "Owner external id is required"))]
    pub owner_external_id: String,
    #[validate(length(min = 1, max = 100, message = "Transfer external id is required"))]
    pub transfer_external_id: String,
    #[validate(length(min = 1, message = "Purchase price ratio is required"))]
    pub purchase_price_ratio: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct BuybackForm {
    #[validate(custom(function = "validate_date"))]
    pub settlement_date: String,
    #[validate(length(min = 1, max = 100, message = "Transfer external id is required"))]
    pub transfer_external_id: String,
}

fn transfer_row(transfer: &Transfer) -> Row {
    let loan = match transfer.loan_id() {
        Some(loan_id) => Cell::link(
            transfer
                .loan
                .as_ref()
                .and_then(|l| l.external_id.clone())
                .unwrap_or_else(|| loan_id.to_string()),
            format!("/asset-owners/loans/{loan_id}"),
        ),
        None => Cell::from(""),
    };
    let mut row = Row::new(vec![
        opt(transfer.transfer_external_id.as_deref()).into(),
        loan,
        transfer.owner_external_id().into(),
        opt(transfer.status.as_deref()).into(),
        opt(transfer.sub_status.as_deref()).into(),
        date(transfer.settlement_date).into(),
        date(transfer.effective_from).into(),
        date(transfer.effective_to).into(),
        opt(transfer.purchase_price_ratio.as_deref()).into(),
    ]);
    if let (true, Some(loan_id)) = (transfer.is_cancellable(), transfer.loan_id()) {
        row = row.action(
            Link::post(
                "Cancel",
                format!("/asset-owners/loans/{loan_id}/transfers/{}/cancel", transfer.transfer_id),
            )
            .danger(),
        );
    }
    row
}

const TRANSFER_COLUMNS: &[&str] = &[
    "Transfer", "Loan", "Owner", "Status", "Sub-status", "Settlement", "From", "To", "Price ratio",
];

pub async fn search(user: AuthUser, Query(query): Query<TransferQuery>) -> Result<Response, PageError> {
    let search = TransferSearch {
        text: query.text.clone(),
        page: query.offset / PAGE_SIZE,
        size: PAGE_SIZE,
    };
    let transfers = user.client.search_transfers(&search).await?;
    let base = format!("/asset-owners?text={}&", urlencoding::encode(query.text.trim()));
    let pager = Pager::new(&base, query.offset, PAGE_SIZE, transfers.items.len(), transfers.total);

    let filter = FormView::new("Search transfers", "/asset-owners")
        .field(
            FormField::text("text", "Owner, transfer or loan external id")
                .value(&query.text)
                .help("Leave blank to list every transfer"),
        )
        .submit("Search");
    let table = Table::new(TRANSFER_COLUMNS)
        .empty("No transfers found")
        .rows(transfers.items.iter().map(transfer_row))
        .pager(pager);
    let page = Page::new("asset-owners", "Asset owner transfers").form(filter).table(table);
    Ok(render(&user, page).await)
}

/// The filter form posts here; redirect to a bookmarkable GET.
pub async fn search_submit(Form(query): Form<TransferQuery>) -> Redirect {
    Redirect::to(&format!("/asset-owners?text={}", urlencoding::encode(query.text.trim())))
}

fn sale_form(loan_id: i64, form: &SaleForm) -> FormView {
    FormView::new("Sell to an asset owner", format!("/asset-owners/loans/{loan_id}/sale"))
        .field(FormField::date("settlementDate", "Settlement date").value(&form.settlement_date).required())
        .field(FormField::text("ownerExternalId", "Owner external id").value(&form.owner_external_id).required())
        .field(
            FormField::text("transferExternalId", "Transfer external id")
                .value(&form.transfer_external_id)
                .required(),
        )
        .field(
            FormField::decimal("purchasePriceRatio", "Purchase price ratio")
                .value(&form.purchase_price_ratio)
                .required()
                .help("1 sells at par"),
        )
        .submit("Sell")
}

fn buyback_form(loan_id: i64, form: &BuybackForm) -> FormView {
    FormView::new("Buy back", format!("/asset-owners/loans/{loan_id}/buyback"))
        .field(FormField::date("settlementDate", "Settlement date").value(&form.settlement_date).required())
        .field(
            FormField::text("transferExternalId", "Transfer external id")
                .value(&form.transfer_external_id)
                .required(),
        )
        .submit("Buy back")
}

pub async fn loan(user: AuthUser, Path(loan_id): Path<i64>) -> Result<Response, PageError> {
    let (loan, transfers) = tokio::join!(user.client.get_loan(loan_id), user.client.loan_transfers(loan_id));
    let (loan, transfers) = (loan?, transfers?);

    let active_owner = transfers
        .items
        .iter()
        .find(|t| t.status.as_deref() == Some("ACTIVE") && t.effective_to.is_none())
        .map(|t| t.owner_external_id().to_string());
    let facts = Facts::new()
        .item("Account", opt(loan.account_no.as_deref()))
        .item("Client", opt(loan.client_name.as_deref()))
        .item("Status", loan.status.value.clone())
        .item("Current owner", active_owner.clone().unwrap_or_else(|| "Self-owned".to_string()));
    let table = Table::new(TRANSFER_COLUMNS)
        .heading("Transfers")
        .empty("This loan has never been transferred")
        .rows(transfers.items.iter().map(transfer_row));

    let mut page = Page::new("asset-owners", format!("Loan {} transfers", opt(loan.account_no.as_deref())))
        .action(Link::get("Loan", format!("/loans/{loan_id}")))
        .facts(facts)
        .table(table);
    page = match active_owner {
        Some(_) => page.form(buyback_form(loan_id, &BuybackForm::default())),
        None => page.form(sale_form(loan_id, &SaleForm { purchase_price_ratio: "1".to_string(), ..SaleForm::default() })),
    };
    Ok(render(&user, page).await)
}

pub async fn sell(user: AuthUser, Path(loan_id): Path<i64>, Form(form): Form<SaleForm>) -> Result<Response, PageError> {
    let back = format!("/asset-owners/loans/{loan_id}");
    if let Err(e) = form.validate() {
        let errors = FormErrors::from(&e);
        return Ok(user.failed(errors.summary(), &back).await);
    }
    let request = SaleRequest {
        settlement_date: parse_date("Settlement date", &form.settlement_date)?,
        owner_external_id: form.owner_external_id.trim().to_string(),
        transfer_external_id: form.transfer_external_id.trim().to_string(),
        purchase_price_ratio: form.purchase_price_ratio.trim().to_string(),
    };
    match user.client.sell_loan(loan_id, &request).await {
        Ok(_) => Ok(user.done("Sale submitted; it settles on the settlement date", &back).await),
        Err(e) => {
            let errors = form_errors(e)?;
            Ok(user.failed(errors.summary(), &back).await)
        }
    }
}

pub async fn buyback(user: AuthUser, Path(loan_id): Path<i64>, Form(form): Form<BuybackForm>) -> Result<Response, PageError> {
    let back = format!("/asset-owners/loans/{loan_id}");
    if let Err(e) = form.validate() {
        let errors = FormErrors::from(&e);
        return Ok(user.failed(errors.summary(), &back).await);
    }
    let request = BuybackRequest {
        settlement_date: parse_date("Settlement date", &form.settlement_date)?,
        transfer_external_id: form.transfer_external_id.trim().to_string(),
    };
    match user.client.buyback_loan(loan_id, &request).await {
        Ok(_) => Ok(user.done("Buyback submitted", &back).await),
        Err(e) => failure(&user, e, &back).await,
    }
}

pub async fn cancel(user: AuthUser, Path((loan_id, transfer_id)): Path<(i64, i64)>) -> Result<Response, PageError> {
    let result = user.client.cancel_transfer(transfer_id).await;
    outcome(&user, result, "Transfer cancelled", &format!("/asset-owners/loans/{loan_id}")).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::fineract::asset_owners::{TransferLoan, TransferOwner};

    fn transfer(status: &str) -> Transfer {
        Transfer {
            transfer_id: 4,
            transfer_external_id: Some("T-4".to_string()),
            loan: Some(TransferLoan { loan_id: 12, external_id: None }),
            owner: Some(TransferOwner { external_id: "FUND-1".to_string() }),
            settlement_date: None,
            effective_from: None,
            effective_to: None,
            status: Some(status.to_string()),
            sub_status: None,
            purchase_price_ratio: Some("1".to_string()),
        }
    }

    #[test]
    fn pending_transfers_offer_cancel() {
        let row = transfer_row(&transfer("PENDING"));
        assert_eq!(row.actions.len(), 1);
        assert_eq!(row.actions[0].href, "/asset-owners/loans/12/transfers/4/cancel");
        assert_eq!(row.cells[1].href.as_deref(), Some("/asset-owners/loans/12"));
    }

    #[test]
    fn settled_transfers_cannot_be_cancelled() {
        assert!(transfer_row(&transfer("ACTIVE")).actions.is_empty());
    }
}
