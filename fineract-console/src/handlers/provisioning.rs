use askama::Template;
use axum::{
    extract::Path,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::fineract::provisioning::{
    CriteriaRequest, CriteriaTemplate, GlAccount, ProvisioningCriteria, ProvisioningDefinition,
};

use crate::forms::{FormErrors, SelectOption};
use crate::handlers::{confirm, failure, form_errors, render, Layout, PageError};
use crate::models::toast::Toast;
use crate::models::user::AuthUser;
use crate::views::{opt, Cell, Facts, Link, Page, Row, Table};

/// The definition table arrives as parallel arrays, one entry per category.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CriteriaForm {
    pub criteria_name: String,
    pub loan_products: Vec<String>,
    pub category_id: Vec<String>,
    pub min_age: Vec<String>,
    pub max_age: Vec<String>,
    pub provisioning_percentage: Vec<String>,
    pub liability_account: Vec<String>,
    pub expense_account: Vec<String>,
}

fn cell(values: &[String], index: usize) -> &str {
    values.get(index).map(|v| v.trim()).unwrap_or("")
}

impl CriteriaForm {
    fn from_criteria(criteria: &ProvisioningCriteria) -> Self {
        let mut form = Self {
            criteria_name: criteria.criteria_name.clone(),
            loan_products: criteria.loan_products.iter().map(|p| p.id.to_string()).collect(),
            ..Self::default()
        };
        for def in &criteria.definitions {
            form.category_id.push(def.category_id.to_string());
            form.min_age.push(def.min_age.to_string());
            form.max_age.push(def.max_age.to_string());
            form.provisioning_percentage.push(def.provisioning_percentage.to_string());
            form.liability_account.push(opt(def.liability_account));
            form.expense_account.push(opt(def.expense_account));
        }
        form
    }

    /// Build the request, skipping categories whose row was left blank.
    fn to_request(&self, template: &CriteriaTemplate) -> Result<CriteriaRequest, FormErrors> {
        let mut definitions = Vec::new();
        for (i, category_id) in self.category_id.iter().enumerate() {
            let (min, max, pct) = (
                cell(&self.min_age, i),
                cell(&self.max_age, i),
                cell(&self.provisioning_percentage, i),
            );
            if min.is_empty() && max.is_empty() && pct.is_empty() {
                continue;
            }
            let category_id: i64 = category_id
                .parse()
                .map_err(|_| FormErrors::general("Unknown provisioning category"))?;
            let name = template
                .definitions
                .iter()
                .find(|c| c.id == category_id)
                .map(|c| c.category_name.clone())
                .unwrap_or_else(|| format!("Category {category_id}"));
            let number = |value: &str, what: &str| {
                value
                    .parse::<i64>()
                    .map_err(|_| FormErrors::general(format!("{name}: {what} must be a whole number")))
            };
            definitions.push(ProvisioningDefinition {
                category_id,
                min_age: number(min, "minimum age")?,
                max_age: number(max, "maximum age")?,
                provisioning_percentage: pct
                    .parse::<Decimal>()
                    .map_err(|_| FormErrors::general(format!("{name}: percentage must be a number")))?,
                liability_account: cell(&self.liability_account, i).parse().ok(),
                expense_account: cell(&self.expense_account, i).parse().ok(),
                category_name: Some(name),
                liability_account_name: None,
                expense_account_name: None,
            });
        }
        let loan_products = template
            .loan_products
            .iter()
            .filter(|p| self.loan_products.contains(&p.id.to_string()))
            .cloned()
            .collect();
        Ok(CriteriaRequest {
            criteria_name: self.criteria_name.trim().to_string(),
            loan_products,
            definitions,
        })
    }
}

pub struct DefinitionRow {
    pub category_id: i64,
    pub category_name: String,
    pub min_age: String,
    pub max_age: String,
    pub percentage: String,
    pub liability_options: Vec<SelectOption>,
    pub expense_options: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "provisioning_form.html")]
pub struct CriteriaFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub action: String,
    pub name: String,
    pub products: Vec<SelectOption>,
    pub rows: Vec<DefinitionRow>,
    pub errors: Vec<String>,
}

fn account_options(accounts: &[GlAccount], selected: &str) -> Vec<SelectOption> {
    let mut options = vec![SelectOption {
        value: String::new(),
        label: "(select)".to_string(),
        selected: selected.is_empty(),
    }];
    options.extend(accounts.iter().map(|a| SelectOption {
        value: a.id.to_string(),
        label: match &a.gl_code {
            Some(code) => format!("{code} {}", a.name),
            None => a.name.clone(),
        },
        selected: a.id.to_string() == selected,
    }));
    options
}

async fn form_template(
    user: &AuthUser,
    title: &str,
    action: &str,
    template: &CriteriaTemplate,
    form: &CriteriaForm,
    errors: &FormErrors,
) -> CriteriaFormTemplate {
    let rows = template
        .definitions
        .iter()
        .map(|category| {
            let index = form
                .category_id
                .iter()
                .position(|id| *id == category.id.to_string());
            let value = |values: &[String]| index.map(|i| cell(values, i).to_string()).unwrap_or_default();
            DefinitionRow {
                category_id: category.id,
                category_name: category.category_name.clone(),
                min_age: value(&form.min_age),
                max_age: value(&form.max_age),
                percentage: value(&form.provisioning_percentage),
                liability_options: account_options(&template.liability_accounts, &value(&form.liability_account)),
                expense_options: account_options(&template.expense_accounts, &value(&form.expense_account)),
            }
        })
        .collect();
    let products = template
        .loan_products
        .iter()
        .map(|p| SelectOption {
            value: p.id.to_string(),
            label: p.name.clone(),
            selected: form.loan_products.contains(&p.id.to_string()),
        })
        .collect();
    let mut messages = errors.general.clone();
    messages.extend(errors.fields.values().cloned());

    CriteriaFormTemplate {
        layout: Layout::new(user, "provisioning").await,
        title: title.to_string(),
        action: action.to_string(),
        name: form.criteria_name.clone(),
        products,
        rows,
        errors: messages,
    }
}

pub async fn list(user: AuthUser) -> Result<Response, PageError> {
    let criteria = user.client.list_criteria().await?;
    let table = Table::new(&["Name", "Created by"])
        .empty("No provisioning criteria defined")
        .rows(criteria.iter().map(|c| {
            Row::new(vec![
                Cell::link(c.criteria_name.clone(), format!("/provisioning/{}", c.criteria_id)),
                opt(c.created_by.as_deref()).into(),
            ])
            .action(Link::get("Edit", format!("/provisioning/{}/edit", c.criteria_id)))
            .action(Link::get("Delete", format!("/provisioning/{}/delete", c.criteria_id)).danger())
        }));
    let page = Page::new("provisioning", "Provisioning criteria")
        .action(Link::get("New criteria", "/provisioning/new"))
        .table(table);
    Ok(render(&user, page).await)
}

pub async fn show(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let criteria = user.client.get_criteria(id).await?;
    let products = criteria
        .loan_products
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let table = Table::new(&["Category", "Min age", "Max age", "Percentage", "Liability", "Expense"])
        .heading("Definitions")
        .rows(criteria.definitions.iter().map(|d| {
            Row::new(vec![
                opt(d.category_name.as_deref()).into(),
                d.min_age.to_string().into(),
                d.max_age.to_string().into(),
                format!("{}%", d.provisioning_percentage).into(),
                opt(d.liability_account_name.as_deref()).into(),
                opt(d.expense_account_name.as_deref()).into(),
            ])
        }));
    let page = Page::new("provisioning", criteria.criteria_name.clone())
        .action(Link::get("Edit", format!("/provisioning/{id}/edit")))
        .action(Link::get("Delete", format!("/provisioning/{id}/delete")).danger())
        .facts(
            Facts::new()
                .item("Created by", opt(criteria.created_by.as_deref()))
                .item("Loan products", products),
        )
        .table(table);
    Ok(render(&user, page).await)
}

pub async fn new(user: AuthUser) -> Result<Response, PageError> {
    let template = user.client.criteria_template().await?;
    let page = form_template(&user, "New provisioning criteria", "/provisioning", &template, &CriteriaForm::default(), &FormErrors::default()).await;
    Ok(page.into_response())
}

pub async fn create(user: AuthUser, Form(form): Form<CriteriaForm>) -> Result<Response, PageError> {
    let template = user.client.criteria_template().await?;
    let errors = match form.to_request(&template) {
        Err(errors) => errors,
        Ok(request) => match user.client.create_criteria(&request).await {
            Ok(_) => return Ok(user.done("Provisioning criteria created", "/provisioning").await),
            Err(e) => form_errors(e)?,
        },
    };
    rejected(&user, "New provisioning criteria", "/provisioning", &template, &form, &errors).await
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let (template, criteria) = tokio::join!(user.client.criteria_template(), user.client.get_criteria(id));
    let (template, criteria) = (template?, criteria?);
    let form = CriteriaForm::from_criteria(&criteria);
    let page = form_template(&user, "Edit provisioning criteria", &format!("/provisioning/{id}"), &template, &form, &FormErrors::default()).await;
    Ok(page.into_response())
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<CriteriaForm>) -> Result<Response, PageError> {
    let template = user.client.criteria_template().await?;
    let errors = match form.to_request(&template) {
        Err(errors) => errors,
        Ok(request) => match user.client.update_criteria(id, &request).await {
            Ok(_) => return Ok(user.done("Provisioning criteria updated", &format!("/provisioning/{id}")).await),
            Err(e) => form_errors(e)?,
        },
    };
    rejected(&user, "Edit provisioning criteria", &format!("/provisioning/{id}"), &template, &form, &errors).await
}

async fn rejected(
    user: &AuthUser,
    title: &str,
    action: &str,
    template: &CriteriaTemplate,
    form: &CriteriaForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    user.toast(Toast::error(errors.summary())).await;
    let page = form_template(user, title, action, template, form, errors).await;
    Ok((axum::http::StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

pub async fn confirm_delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let criteria = user.client.get_criteria(id).await?;
    Ok(confirm(
        &user,
        "provisioning",
        "Delete provisioning criteria",
        format!("Delete {}?", criteria.criteria_name),
        &format!("/provisioning/{id}/delete"),
        "/provisioning",
    )
    .await)
}

pub async fn delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    match user.client.delete_criteria(id).await {
        Ok(_) => Ok(user.done("Provisioning criteria deleted", "/provisioning").await),
        Err(e) => failure(&user, e, &format!("/provisioning/{id}")).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::fineract::provisioning::{LoanProductRef, ProvisioningCategory};

    fn template() -> CriteriaTemplate {
        CriteriaTemplate {
            definitions: vec![
                ProvisioningCategory { id: 1, category_name: "STANDARD".to_string(), category_description: None },
                ProvisioningCategory { id: 2, category_name: "SUB-STANDARD".to_string(), category_description: None },
            ],
            loan_products: vec![LoanProductRef { id: 7, name: "Personal".to_string() }],
            liability_accounts: vec![],
            expense_accounts: vec![],
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn blank_rows_are_left_out() {
        let form = CriteriaForm {
            criteria_name: " Default ".to_string(),
            loan_products: strings(&["7"]),
            category_id: strings(&["1", "2"]),
            min_age: strings(&["0", ""]),
            max_age: strings(&["30", ""]),
            provisioning_percentage: strings(&["1.5", ""]),
            liability_account: strings(&["10", ""]),
            expense_account: strings(&["11", ""]),
        };
        let request = form.to_request(&template()).unwrap();
        assert_eq!(request.criteria_name, "Default");
        assert_eq!(request.loan_products.len(), 1);
        assert_eq!(request.definitions.len(), 1);
        let def = &request.definitions[0];
        assert_eq!((def.min_age, def.max_age), (0, 30));
        assert_eq!(def.provisioning_percentage, Decimal::new(15, 1));
        assert_eq!(def.liability_account, Some(10));
        assert_eq!(def.category_name.as_deref(), Some("STANDARD"));
    }

    #[test]
    fn bad_numbers_name_the_category() {
        let form = CriteriaForm {
            criteria_name: "Default".to_string(),
            category_id: strings(&["2"]),
            min_age: strings(&["thirty"]),
            max_age: strings(&["60"]),
            provisioning_percentage: strings(&["5"]),
            ..CriteriaForm::default()
        };
        let errors = form.to_request(&template()).unwrap_err();
        assert_eq!(errors.summary(), "SUB-STANDARD: minimum age must be a whole number");
    }
}
