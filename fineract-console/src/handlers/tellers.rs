use axum::{extract::Path, response::Response, Form};
use serde::Deserialize;
use service_core::fineract::tellers::{
    CashMovement, CashTransaction, CashierRequest, Teller, TellerRequest, TellerStatus,
};
use validator::{Validate, ValidationError};

use crate::forms::validators::{validate_amount, validate_date, validate_id};
use crate::forms::{
    blank_as_none, checkbox, parse_amount, parse_date, parse_id, parse_optional_date, FieldKind,
    FormErrors, FormField, FormView,
};
use crate::handlers::{confirm, failure, form_errors, reject, render, PageError};
use crate::models::user::AuthUser;
use crate::views::{date, opt, options, yes_no, Cell, Facts, Link, Page, Row, Table};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct TellerForm {
    #[validate(custom(function = "validate_id"))]
    pub office_id: String,
    #[validate(length(min = 1, max = 50, message = "Name is required"))]
    pub name: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[validate(custom(function = "validate_date"))]
    pub start_date: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_date"))]
    pub end_date: Option<String>,
    pub status: String,
}

impl TellerForm {
    fn from_teller(teller: &Teller) -> Self {
        Self {
            office_id: opt(teller.office_id),
            name: teller.name.clone(),
            description: teller.description.clone(),
            start_date: date(teller.start_date),
            end_date: teller.end_date.map(|d| date(Some(d))),
            status: teller.status.unwrap_or(TellerStatus::Active).code().to_string(),
        }
    }

    fn to_request(&self) -> Result<TellerRequest, PageError> {
        let status = self
            .status
            .parse::<i64>()
            .ok()
            .and_then(TellerStatus::from_code)
            .unwrap_or(TellerStatus::Active);
        Ok(TellerRequest {
            office_id: parse_id("Office", &self.office_id)?,
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            start_date: parse_date("Start date", &self.start_date)?,
            end_date: parse_optional_date("End date", self.end_date.as_deref())?,
            status: status.code(),
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "hours_for_part_day"))]
pub struct CashierForm {
    #[validate(custom(function = "validate_id"))]
    pub staff_id: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[validate(custom(function = "validate_date"))]
    pub start_date: String,
    #[validate(custom(function = "validate_date"))]
    pub end_date: String,
    #[serde(deserialize_with = "checkbox")]
    pub is_full_day: bool,
    #[serde(deserialize_with = "blank_as_none")]
    pub hour_start_time: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub hour_end_time: Option<String>,
}

fn hours_for_part_day(form: &CashierForm) -> Result<(), ValidationError> {
    if !form.is_full_day && (form.hour_start_time.is_none() || form.hour_end_time.is_none()) {
        let mut err = ValidationError::new("hours");
        err.message = Some("Enter start and end hours, or tick full day".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CashForm {
    #[validate(custom(function = "validate_date"))]
    pub txn_date: String,
    #[validate(custom(function = "validate_amount"))]
    pub txn_amount: String,
    #[validate(length(equal = 3, message = "Use a three-letter currency code"))]
    pub currency_code: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub txn_note: Option<String>,
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let tellers = user.client.list_tellers().await?;
    let table = Table::new(&["Name", "Office", "Status", "Start", "End"])
        .empty("No tellers yet")
        .rows(tellers.iter().map(|t| {
            Row::new(vec![
                Cell::link(t.name.clone(), format!("/tellers/{}", t.id)),
                opt(t.office_name.as_deref()).into(),
                status_label(t.status).into(),
                date(t.start_date).into(),
                date(t.end_date).into(),
            ])
            .action(Link::get("Edit", format!("/tellers/{}/edit", t.id)))
        }));
    let page = Page::new("tellers", "Tellers")
        .action(Link::get("New teller", "/tellers/new"))
        .table(table);
    Ok(render(&user, page).await)
}

fn status_label(status: Option<TellerStatus>) -> &'static str {
    match status {
        Some(TellerStatus::Active) => "Active",
        Some(TellerStatus::Inactive) => "Inactive",
        None => "",
    }
}

async fn teller_form_page(
    user: &AuthUser,
    title: &str,
    action: &str,
    form: &TellerForm,
    errors: &FormErrors,
) -> Result<Page, PageError> {
    let offices = user.client.list_offices().await?;
    let offices = options(offices, |o| (o.id, o.name));
    let statuses = [TellerStatus::Active, TellerStatus::Inactive]
        .into_iter()
        .map(|s| (s.code().to_string(), status_label(Some(s)).to_string()));
    let status = if form.status.is_empty() {
        TellerStatus::Active.code().to_string()
    } else {
        form.status.clone()
    };

    let view = FormView::new(title, action)
        .field(FormField::select("officeId", "Office", offices, &form.office_id).required())
        .field(FormField::text("name", "Name").value(&form.name).required())
        .field(FormField::text("description", "Description").value(opt(form.description.as_deref())))
        .field(FormField::date("startDate", "Start date").value(&form.start_date).required())
        .field(FormField::date("endDate", "End date").value(opt(form.end_date.as_deref())))
        .field(FormField::select("status", "Status", statuses, &status))
        .cancel("/tellers")
        .with_errors(errors);
    Ok(Page::new("tellers", title).form(view))
}

pub async fn new(user: AuthUser) -> Result<Response, PageError> {
    let form = TellerForm {
        start_date: date(Some(chrono::Local::now().date_naive())),
        ..TellerForm::default()
    };
    let page = teller_form_page(&user, "New teller", "/tellers", &form, &FormErrors::default()).await?;
    Ok(render(&user, page).await)
}

pub async fn create(user: AuthUser, Form(form): Form<TellerForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_teller(&form.to_request()?).await {
            Ok(result) => {
                let to = result
                    .resource_id
                    .map(|id| format!("/tellers/{id}"))
                    .unwrap_or_else(|| "/tellers".to_string());
                return Ok(user.done("Teller created", &to).await);
            }
            Err(e) => form_errors(e)?,
        },
    };
    let page = teller_form_page(&user, "New teller", "/tellers", &form, &errors).await?;
    Ok(reject(&user, &errors, page).await)
}

pub async fn show(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let (teller, cashiers) = tokio::join!(user.client.get_teller(id), user.client.list_cashiers(id));
    let teller = teller?;
    let cashiers = cashiers?;

    let facts = Facts::new()
        .item("Office", opt(teller.office_name.as_deref()))
        .item("Status", status_label(teller.status))
        .item("Description", opt(teller.description.as_deref()))
        .item("Start", date(teller.start_date))
        .item("End", date(teller.end_date));

    let table = Table::new(&["Cashier", "Description", "From", "To", "Full day"])
        .heading("Cashiers")
        .empty("No cashiers assigned")
        .rows(cashiers.iter().map(|c| {
            Row::new(vec![
                opt(c.staff_name.as_deref()).into(),
                opt(c.description.as_deref()).into(),
                date(c.start_date).into(),
                date(c.end_date).into(),
                yes_no(c.is_full_day).into(),
            ])
            .action(Link::get("Allocate", format!("/tellers/{id}/cashiers/{}/allocate", c.id)))
            .action(Link::get("Settle", format!("/tellers/{id}/cashiers/{}/settle", c.id)))
            .action(Link::get("Remove", format!("/tellers/{id}/cashiers/{}/delete", c.id)).danger())
        }));

    let cashier_form = cashier_form_view(&user, id, teller.office_id, &CashierForm::default(), &FormErrors::default()).await?;

    let page = Page::new("tellers", teller.name.clone())
        .action(Link::get("Edit", format!("/tellers/{id}/edit")))
        .action(Link::get("Delete", format!("/tellers/{id}/delete")).danger())
        .facts(facts)
        .table(table)
        .form(cashier_form);
    Ok(render(&user, page).await)
}

async fn cashier_form_view(
    user: &AuthUser,
    teller_id: i64,
    office_id: Option<i64>,
    form: &CashierForm,
    errors: &FormErrors,
) -> Result<FormView, PageError> {
    let staff = user.client.list_staff(office_id).await?;
    let staff = options(staff, |s| (s.id, s.display_name));
    let today = date(Some(chrono::Local::now().date_naive()));
    let start = if form.start_date.is_empty() { today.clone() } else { form.start_date.clone() };
    let end = if form.end_date.is_empty() { today } else { form.end_date.clone() };

    Ok(FormView::new("Assign cashier", format!("/tellers/{teller_id}/cashiers"))
        .field(FormField::select("staffId", "Staff", staff, &form.staff_id).required())
        .field(FormField::text("description", "Description").value(opt(form.description.as_deref())))
        .field(FormField::date("startDate", "From").value(start).required())
        .field(FormField::date("endDate", "To").value(end).required())
        .field(FormField::checkbox("isFullDay", "Full day", form.is_full_day || form.staff_id.is_empty()))
        .field(FormField::text("hourStartTime", "Start hour").value(opt(form.hour_start_time.as_deref())).help("HH:MM"))
        .field(FormField::text("hourEndTime", "End hour").value(opt(form.hour_end_time.as_deref())).help("HH:MM"))
        .submit("Assign")
        .with_errors(errors))
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let teller = user.client.get_teller(id).await?;
    let form = TellerForm::from_teller(&teller);
    let page = teller_form_page(&user, "Edit teller", &format!("/tellers/{id}"), &form, &FormErrors::default()).await?;
    Ok(render(&user, page).await)
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<TellerForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_teller(id, &form.to_request()?).await {
            Ok(_) => return Ok(user.done("Teller updated", &format!("/tellers/{id}")).await),
            Err(e) => form_errors(e)?,
        },
    };
    let page = teller_form_page(&user, "Edit teller", &format!("/tellers/{id}"), &form, &errors).await?;
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let teller = user.client.get_teller(id).await?;
    Ok(confirm(
        &user,
        "tellers",
        "Delete teller",
        format!("Delete teller {}?", teller.name),
        &format!("/tellers/{id}/delete"),
        &format!("/tellers/{id}"),
    )
    .await)
}

pub async fn delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    match user.client.delete_teller(id).await {
        Ok(_) => Ok(user.done("Teller deleted", "/tellers").await),
        Err(e) => failure(&user, e, &format!("/tellers/{id}")).await,
    }
}

pub async fn create_cashier(user: AuthUser, Path(id): Path<i64>, Form(form): Form<CashierForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => {
            let request = CashierRequest {
                staff_id: parse_id("Staff", &form.staff_id)?,
                description: form.description.clone(),
                start_date: parse_date("From", &form.start_date)?,
                end_date: parse_date("To", &form.end_date)?,
                is_full_day: form.is_full_day,
                hour_start_time: form.hour_start_time.clone().filter(|_| !form.is_full_day),
                hour_end_time: form.hour_end_time.clone().filter(|_| !form.is_full_day),
            };
            match user.client.create_cashier(id, &request).await {
                Ok(_) => return Ok(user.done("Cashier assigned", &format!("/tellers/{id}")).await),
                Err(e) => form_errors(e)?,
            }
        }
    };
    let teller = user.client.get_teller(id).await?;
    let view = cashier_form_view(&user, id, teller.office_id, &form, &errors).await?;
    let page = Page::new("tellers", teller.name.clone())
        .action(Link::get("Back to teller", format!("/tellers/{id}")))
        .form(view);
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete_cashier(user: AuthUser, Path((id, cashier_id)): Path<(i64, i64)>) -> Result<Response, PageError> {
    Ok(confirm(
        &user,
        "tellers",
        "Remove cashier",
        "Remove this cashier from the teller?",
        &format!("/tellers/{id}/cashiers/{cashier_id}/delete"),
        &format!("/tellers/{id}"),
    )
    .await)
}

pub async fn delete_cashier(user: AuthUser, Path((id, cashier_id)): Path<(i64, i64)>) -> Result<Response, PageError> {
    let back = format!("/tellers/{id}");
    match user.client.delete_cashier(id, cashier_id).await {
        Ok(_) => Ok(user.done("Cashier removed", &back).await),
        Err(e) => failure(&user, e, &back).await,
    }
}

fn cash_page(id: i64, cashier_id: i64, movement: CashMovement, form: &CashForm, errors: &FormErrors) -> Page {
    let title = match movement {
        CashMovement::Allocate => "Allocate cash",
        CashMovement::Settle => "Settle cash",
    };
    let today = date(Some(chrono::Local::now().date_naive()));
    let view = FormView::new(title, format!("/tellers/{id}/cashiers/{cashier_id}/{}", movement.as_str()))
        .field(FormField::date("txnDate", "Date").value(if form.txn_date.is_empty() { today } else { form.txn_date.clone() }).required())
        .field(FormField::decimal("txnAmount", "Amount").value(&form.txn_amount).required())
        .field(FormField::text("currencyCode", "Currency").value(&form.currency_code).required().help("ISO code, e.g. USD"))
        .field(FormField::text("txnNote", "Note").kind(FieldKind::TextArea).value(opt(form.txn_note.as_deref())))
        .submit(title)
        .cancel(format!("/tellers/{id}"))
        .with_errors(errors);
    Page::new("tellers", title).form(view)
}

pub async fn allocate_form(user: AuthUser, Path((id, cashier_id)): Path<(i64, i64)>) -> Response {
    let page = cash_page(id, cashier_id, CashMovement::Allocate, &CashForm::default(), &FormErrors::default());
    render(&user, page).await
}

pub async fn settle_form(user: AuthUser, Path((id, cashier_id)): Path<(i64, i64)>) -> Response {
    let page = cash_page(id, cashier_id, CashMovement::Settle, &CashForm::default(), &FormErrors::default());
    render(&user, page).await
}

pub async fn allocate(user: AuthUser, Path((id, cashier_id)): Path<(i64, i64)>, Form(form): Form<CashForm>) -> Result<Response, PageError> {
    move_cash(user, id, cashier_id, CashMovement::Allocate, form).await
}

pub async fn settle(user: AuthUser, Path((id, cashier_id)): Path<(i64, i64)>, Form(form): Form<CashForm>) -> Result<Response, PageError> {
    move_cash(user, id, cashier_id, CashMovement::Settle, form).await
}

async fn move_cash(
    user: AuthUser,
    id: i64,
    cashier_id: i64,
    movement: CashMovement,
    form: CashForm,
) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => {
            let transaction = CashTransaction {
                txn_date: parse_date("Date", &form.txn_date)?,
                txn_amount: parse_amount("Amount", &form.txn_amount)?,
                currency_code: form.currency_code.trim().to_uppercase(),
                txn_note: form.txn_note.clone(),
            };
            let (result, message) = match movement {
                CashMovement::Allocate => (
                    user.client.allocate_cash(id, cashier_id, &transaction).await,
                    "Cash allocated",
                ),
                CashMovement::Settle => (
                    user.client.settle_cash(id, cashier_id, &transaction).await,
                    "Cash settled",
                ),
            };
            match result {
                Ok(_) => return Ok(user.done(message, &format!("/tellers/{id}")).await),
                Err(e) => form_errors(e)?,
            }
        }
    };
    let page = cash_page(id, cashier_id, movement, &form, &errors);
    Ok(reject(&user, &errors, page).await)
}
