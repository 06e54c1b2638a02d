use askama::Template;
use axum::{
    response::{IntoResponse, Response},
    Form,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;
use service_core::fineract::collection_sheet::{CollectionSheet, SaveSheetRequest, SheetEntry, SheetRequest};
use validator::Validate;

use crate::forms::validators::{validate_date, validate_id};
use crate::forms::{blank_as_none, parse_date, parse_id, parse_optional_id, FormErrors, FormField, FormView};
use crate::handlers::{failure, form_errors, reject, render, Layout, PageError};
use crate::models::user::AuthUser;
use crate::views::{optional, options, Page};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SheetForm {
    #[validate(custom(function = "validate_id"))]
    pub office_id: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_id"))]
    pub staff_id: Option<String>,
    #[validate(custom(function = "validate_date"))]
    pub transaction_date: String,
}

#[derive(Template)]
#[template(path = "collection_sheet.html")]
pub struct CollectionSheetTemplate {
    pub layout: Layout,
    pub transaction_date: String,
    pub sheet: CollectionSheet,
}

async fn sheet_page(user: &AuthUser, form: &SheetForm, errors: &FormErrors) -> Result<Page, PageError> {
    let (offices, staff) = tokio::join!(user.client.list_offices(), user.client.list_staff(None));
    let (offices, staff) = (offices?, staff?);
    let staff = staff.into_iter().filter(|s| s.is_active && s.is_loan_officer);
    let view = FormView::new("Generate collection sheet", "/collection-sheet/generate")
        .field(
            FormField::select(
                "officeId",
                "Office",
                options(offices, |o| (o.id, o.name_decorated.unwrap_or(o.name))),
                &form.office_id,
            )
            .required(),
        )
        .field(FormField::select(
            "staffId",
            "Loan officer",
            optional(options(staff, |s| {
                let label = match s.office_name {
                    Some(office) => format!("{} ({office})", s.display_name),
                    None => s.display_name,
                };
                (s.id, label)
            })),
            form.staff_id.as_deref().unwrap_or(""),
        ))
        .field(FormField::date("transactionDate", "Meeting date").value(&form.transaction_date).required())
        .submit("Generate")
        .with_errors(errors);
    Ok(Page::new("collection-sheet", "Collection sheet").form(view))
}

pub async fn show(user: AuthUser) -> Result<Response, PageError> {
    let form = SheetForm {
        transaction_date: chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
        ..SheetForm::default()
    };
    let page = sheet_page(&user, &form, &FormErrors::default()).await?;
    Ok(render(&user, page).await)
}

pub async fn generate(user: AuthUser, Form(form): Form<SheetForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => {
            let request = SheetRequest {
                office_id: parse_id("Office", &form.office_id)?,
                staff_id: parse_optional_id("Loan officer", form.staff_id.as_deref())?,
                transaction_date: parse_date("Meeting date", &form.transaction_date)?,
            };
            match user.client.generate_collection_sheet(&request).await {
                Ok(sheet) => {
                    let page = CollectionSheetTemplate {
                        layout: Layout::new(&user, "collection-sheet").await,
                        transaction_date: form.transaction_date.clone(),
                        sheet,
                    };
                    return Ok(page.into_response());
                }
                Err(e) => form_errors(e)?,
            }
        }
    };
    let page = sheet_page(&user, &form, &errors).await?;
    Ok(reject(&user, &errors, page).await)
}

/// Read `loan_<id>` and `savings_<id>_<type>` inputs, skipping blanks.
fn sheet_entries(fields: &[(String, String)]) -> Result<Vec<SheetEntry>, AppError> {
    let mut entries = Vec::new();
    for (name, value) in fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let amount = || {
            value
                .parse::<Decimal>()
                .map_err(|_| AppError::BadRequest(anyhow::anyhow!("'{value}' is not an amount")))
        };
        if let Some(id) = name.strip_prefix("loan_") {
            entries.push(SheetEntry::Loan {
                loan_id: parse_id("Loan", id)?,
                amount: amount()?,
            });
        } else if let Some(rest) = name.strip_prefix("savings_") {
            let (id, kind) = rest
                .split_once('_')
                .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Malformed savings field {name}")))?;
            entries.push(SheetEntry::Savings {
                savings_id: parse_id("Savings account", id)?,
                deposit_account_type: parse_id("Deposit type", kind)?,
                amount: amount()?,
            });
        }
    }
    Ok(entries)
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

pub async fn save(user: AuthUser, Form(fields): Form<Vec<(String, String)>>) -> Result<Response, PageError> {
    let date: NaiveDate = parse_date("Meeting date", field(&fields, "transactionDate").unwrap_or(""))?;
    let payment_type_id = parse_optional_id("Payment type", field(&fields, "paymentTypeId"))?;
    let entries = match sheet_entries(&fields) {
        Ok(entries) => entries,
        Err(e) => return Ok(user.failed(e.user_message(), "/collection-sheet").await),
    };
    let request = SaveSheetRequest::new(date, payment_type_id, &entries);
    match user.client.save_collection_sheet(&request).await {
        Ok(_) => {
            let message = format!("Saved {} collections for {date}", request.transaction_count());
            Ok(user.done(message, "/collection-sheet").await)
        }
        Err(e) => failure(&user, e, "/collection-sheet").await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn reads_loan_and_savings_inputs() {
        let fields = pairs(&[
            ("transactionDate", "2024-06-03"),
            ("loan_1", "25.50"),
            ("loan_2", ""),
            ("savings_9_100", "10"),
        ]);
        let entries = sheet_entries(&fields).unwrap();
        assert_eq!(
            entries,
            vec![
                SheetEntry::Loan { loan_id: 1, amount: Decimal::new(2550, 2) },
                SheetEntry::Savings { savings_id: 9, deposit_account_type: 100, amount: Decimal::new(10, 0) },
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        let err = sheet_entries(&pairs(&[("loan_1", "ten")])).unwrap_err();
        assert_eq!(err.user_message(), "'ten' is not an amount");
    }

    #[test]
    fn blank_fields_are_absent() {
        let fields = pairs(&[("paymentTypeId", " ")]);
        assert_eq!(field(&fields, "paymentTypeId"), None);
    }
}
