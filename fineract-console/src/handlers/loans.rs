use axum::{
    extract::{Path, Query},
    response::{Redirect, Response},
    Form,
};
use serde::Deserialize;
use service_core::fineract::loans::{LoanCommand, LoanCommandRequest, LoanQuery, RepaymentRequest};
use validator::Validate;

use crate::forms::validators::{validate_amount, validate_date, validate_id};
use crate::forms::{blank_as_none, parse_amount, parse_date, parse_optional_date, parse_optional_id, FieldKind, FormErrors, FormField, FormView};
use crate::handlers::{outcome, render, PageError, PAGE_SIZE};
use crate::models::user::AuthUser;
use crate::views::{date, opt, yes_no, Cell, Facts, Link, Page, Pager, Row, Table};

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LoanSearch {
    pub account_no: String,
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct LoanCommandForm {
    pub command: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_date"))]
    pub date: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_amount"))]
    pub amount: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(length(max = 1000, message = "Note is too long"))]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RepaymentForm {
    #[validate(custom(function = "validate_date"))]
    pub transaction_date: String,
    #[validate(custom(function = "validate_amount"))]
    pub transaction_amount: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_id"))]
    pub payment_type_id: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub note: Option<String>,
}

pub async fn list(user: AuthUser, Query(search): Query<LoanSearch>) -> Result<Response, PageError> {
    let query = LoanQuery {
        offset: search.offset,
        limit: PAGE_SIZE,
        account_no: Some(search.account_no.trim().to_string()),
        external_id: None,
    };
    let loans = user.client.list_loans(&query).await?;

    let base = if search.account_no.trim().is_empty() {
        "/loans?".to_string()
    } else {
        format!("/loans?accountNo={}&", urlencoding::encode(search.account_no.trim()))
    };
    let table = Table::new(&["Account", "Client", "Product", "Principal", "Outstanding", "Status"])
        .empty("No loans found")
        .rows(loans.items.iter().map(|loan| {
            let outstanding = loan.summary.as_ref().and_then(|s| s.total_outstanding);
            Row::new(vec![
                Cell::link(opt(loan.account_no.as_deref()), format!("/loans/{}", loan.id)),
                match loan.client_id {
                    Some(client_id) => Cell::link(opt(loan.client_name.as_deref()), format!("/clients/{client_id}")),
                    None => opt(loan.client_name.as_deref()).into(),
                },
                opt(loan.loan_product_name.as_deref()).into(),
                opt(loan.principal).into(),
                opt(outstanding).into(),
                loan.status.value.clone().into(),
            ])
        }))
        .pager(Pager::new(&base, search.offset, PAGE_SIZE, loans.items.len(), loans.total));

    let search_form = FormView::new("Find by account number", "/loans/search")
        .field(FormField::text("accountNo", "Account number").value(&search.account_no))
        .submit("Search");

    let page = Page::new("loans", "Loans").form(search_form).table(table);
    Ok(render(&user, page).await)
}

pub async fn search(Form(search): Form<LoanSearch>) -> Redirect {
    let account_no = search.account_no.trim();
    if account_no.is_empty() {
        Redirect::to("/loans")
    } else {
        Redirect::to(&format!("/loans?accountNo={}", urlencoding::encode(account_no)))
    }
}

pub async fn show(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let loan = user.client.get_loan(id).await?;
    let currency = loan.currency.code.clone();
    let balance = loan.summary.clone().unwrap_or_default();

    let facts = Facts::new()
        .item("Client", opt(loan.client_name.as_deref()))
        .item("Product", opt(loan.loan_product_name.as_deref()))
        .item("Status", loan.status.value.clone())
        .item("Principal", format!("{} {}", opt(loan.principal), currency))
        .item("Approved principal", opt(loan.approved_principal))
        .item("Outstanding", opt(balance.total_outstanding))
        .item("Overdue", opt(balance.total_overdue))
        .item("Submitted", date(loan.timeline.submitted_on_date))
        .item("Approved", date(loan.timeline.approved_on_date))
        .item("Disbursed", date(loan.timeline.actual_disbursement_date))
        .item("Closed", date(loan.timeline.closed_on_date));

    let schedule = Table::new(&["#", "Due", "Principal", "Interest", "Fees", "Due total", "Paid", "Outstanding", "Complete"])
        .heading("Repayment schedule")
        .empty("No schedule yet")
        .rows(loan.repayment_schedule.periods.iter().filter(|p| p.period.is_some()).map(|p| {
            Row::new(vec![
                opt(p.period).into(),
                date(Some(p.due_date)).into(),
                opt(p.principal_due).into(),
                opt(p.interest_due).into(),
                opt(p.fee_charges_due).into(),
                opt(p.total_due_for_period).into(),
                opt(p.total_paid_for_period).into(),
                opt(p.total_outstanding_for_period).into(),
                yes_no(p.complete).into(),
            ])
        }));

    let transactions = Table::new(&["Date", "Type", "Amount", "Balance", "Reversed"])
        .heading("Transactions")
        .empty("No transactions")
        .rows(loan.transactions.iter().map(|t| {
            Row::new(vec![
                date(Some(t.date)).into(),
                t.kind.value.clone().into(),
                t.amount.to_string().into(),
                opt(t.outstanding_loan_balance).into(),
                yes_no(t.manually_reversed).into(),
            ])
        }));

    let today = date(Some(chrono::Local::now().date_naive()));
    let commands = LoanCommand::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), c.label().to_string()));
    let command_form = FormView::new("Change state", format!("/loans/{id}/command"))
        .field(FormField::select("command", "Command", commands, ""))
        .field(FormField::date("date", "Date").value(&today).help("Not used by the undo commands"))
        .field(FormField::decimal("amount", "Amount").help("Approved or disbursed amount; defaults to the principal"))
        .field(FormField::text("note", "Note").kind(FieldKind::TextArea))
        .submit("Run");

    let repayment_form = FormView::new("Record repayment", format!("/loans/{id}/repayment"))
        .field(FormField::date("transactionDate", "Date").value(&today).required())
        .field(FormField::decimal("transactionAmount", "Amount").required())
        .field(FormField::number("paymentTypeId", "Payment type id"))
        .field(FormField::text("note", "Note"))
        .submit("Record repayment");

    let mut page = Page::new("loans", format!("Loan {}", opt(loan.account_no.as_deref())))
        .action(Link::get("Transfers", format!("/asset-owners/loans/{id}")));
    if let Some(client_id) = loan.client_id {
        page = page.action(Link::get("Client", format!("/clients/{client_id}")));
    }
    let page = page
        .action(Link::get("Data tables", format!("/datatables/entries?apptable=m_loan&entityId={id}")))
        .facts(facts)
        .form(command_form)
        .form(repayment_form)
        .table(schedule)
        .table(transactions);
    Ok(render(&user, page).await)
}

pub async fn command(user: AuthUser, Path(id): Path<i64>, Form(form): Form<LoanCommandForm>) -> Result<Response, PageError> {
    let back = format!("/loans/{id}");
    let Some(command) = LoanCommand::parse(&form.command) else {
        return Ok(user.failed("Choose a command", &back).await);
    };
    if let Err(e) = form.validate() {
        return Ok(user.failed(FormErrors::from(&e).summary(), &back).await);
    }
    let request = LoanCommandRequest {
        date: parse_optional_date("Date", form.date.as_deref())?,
        amount: form.amount.as_deref().map(|a| parse_amount("Amount", a)).transpose()?,
        note: form.note.clone(),
    };
    let result = user.client.loan_command(id, command, &request).await;
    outcome(&user, result, format!("{} done", command.label()), &back).await
}

pub async fn repayment(user: AuthUser, Path(id): Path<i64>, Form(form): Form<RepaymentForm>) -> Result<Response, PageError> {
    let back = format!("/loans/{id}");
    if let Err(e) = form.validate() {
        return Ok(user.failed(FormErrors::from(&e).summary(), &back).await);
    }
    let request = RepaymentRequest {
        transaction_date: parse_date("Date", &form.transaction_date)?,
        transaction_amount: parse_amount("Amount", &form.transaction_amount)?,
        payment_type_id: parse_optional_id("Payment type", form.payment_type_id.as_deref())?,
        note: form.note.clone(),
    };
    let result = user.client.make_repayment(id, &request).await;
    outcome(&user, result, format!("Repayment of {} recorded", request.transaction_amount), &back).await
}
